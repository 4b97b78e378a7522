//! Desktop front-end (C11, added), behind the `gui` Cargo feature.
//!
//! A minimal `eframe`/`egui` window wrapping `orchestrator::run`: a URL
//! field, an output-directory picker (`rfd`, already used for the
//! interactive-login modal in `session::mod`), a Start/Cancel pair, and a
//! scrolling log pane. Grounded on the only genuine `egui` usage found
//! anywhere in the retrieval pack — a single `egui::TextureHandle` field
//! in `HKHOP-Project-PixelDust`'s browser state struct — plus the
//! teacher's own `rfd` dialog pattern; no complete GUI-toolkit example
//! exists in the pack, so the event-loop shape here follows `eframe`'s
//! own documented `App` contract rather than an in-pack precedent.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use webgrab::cancel::CancelToken;
use webgrab::orchestrator::{self, RunOptions};

enum RunEvent {
    Log(String),
    Finished(Result<usize, String>),
}

struct WebgrabApp {
    url: String,
    output_dir: String,
    log: Vec<String>,
    running: bool,
    cancel: Option<CancelToken>,
    events: Receiver<RunEvent>,
    sender: Sender<RunEvent>,
    runtime: tokio::runtime::Runtime,
}

impl WebgrabApp {
    fn new() -> Self {
        let (sender, events) = channel();
        let runtime = tokio::runtime::Runtime::new().expect("failed to start async runtime");
        Self {
            url: String::new(),
            output_dir: String::new(),
            log: Vec::new(),
            running: false,
            cancel: None,
            events,
            sender,
            runtime,
        }
    }

    fn start(&mut self) {
        if self.running || self.url.trim().is_empty() || self.output_dir.trim().is_empty() {
            return;
        }

        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());
        self.running = true;
        self.log.clear();

        let url = self.url.clone();
        let output_root = PathBuf::from(self.output_dir.clone());
        let sender = self.sender.clone();

        let log_sender = sender.clone();
        let on_log: webgrab::strategies::OnLog = Arc::new(move |msg: &str| {
            let _ = log_sender.send(RunEvent::Log(msg.to_string()));
        });

        self.runtime.spawn(async move {
            let mut options = orchestrator::default_options(&output_root, cancel);
            options.on_log = on_log;

            let result = orchestrator::run(&url, options).await;
            let outcome = result.map(|tree| tree.len()).map_err(|e| e.to_string());
            let _ = sender.send(RunEvent::Finished(outcome));
        });
    }

    fn cancel_run(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(RunEvent::Log(line)) => self.log.push(line),
                Ok(RunEvent::Finished(Ok(count))) => {
                    self.log.push(format!("done: {count} file(s) retrieved"));
                    self.running = false;
                }
                Ok(RunEvent::Finished(Err(e))) => {
                    self.log.push(format!("failed: {e}"));
                    self.running = false;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

impl eframe::App for WebgrabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("webgrab");

            ui.horizontal(|ui| {
                ui.label("URL:");
                ui.text_edit_singleline(&mut self.url);
            });

            ui.horizontal(|ui| {
                ui.label("Output directory:");
                ui.text_edit_singleline(&mut self.output_dir);
                if ui.button("Browse…").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.output_dir = dir.to_string_lossy().to_string();
                    }
                }
            });

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.running, egui::Button::new("Start"))
                    .clicked()
                {
                    self.start();
                }
                if ui
                    .add_enabled(self.running, egui::Button::new("Cancel"))
                    .clicked()
                {
                    self.cancel_run();
                }
            });

            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                for line in &self.log {
                    ui.label(line);
                }
            });
        });

        if self.running {
            ctx.request_repaint();
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "webgrab",
        options,
        Box::new(|_cc| Ok(Box::new(WebgrabApp::new()))),
    )
}
