//! `webgrab` CLI — classify a project URL and retrieve its source/assets
//! through the matching strategy, per spec §6.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use webgrab::archive::{self, ArchiveFormat};
use webgrab::cancel::CancelToken;
use webgrab::orchestrator::{self, RunOptions};

/// Retrieve the source or assets behind a project URL.
#[derive(Parser, Debug)]
#[command(name = "webgrab", version, about)]
struct Cli {
    /// URL to classify and retrieve.
    url: String,

    /// Output root, created if absent.
    #[arg(long = "out", value_name = "DIR")]
    out: PathBuf,

    /// Pull cookies for the URL's domain from a locally-installed browser
    /// before running.
    #[arg(long = "import-cookies", value_name = "BROWSER")]
    import_cookies: Option<String>,

    /// Open a visible browser for manual login before running.
    #[arg(long = "interactive-login")]
    interactive_login: bool,

    /// HTTP proxy used for all fetches.
    #[arg(long = "proxy", value_name = "URL")]
    proxy: Option<String>,

    /// Pack the output root into a single archive once the run finishes.
    #[arg(long = "archive", value_name = "FORMAT")]
    archive: Option<String>,

    /// Overrides the asset collector's worker pool size (default 20).
    #[arg(long = "concurrency", value_name = "N")]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let archive_format = match cli.archive.as_deref().map(str::parse::<ArchiveFormat>) {
        Some(Ok(format)) => Some(format),
        Some(Err(e)) => {
            eprintln!("invalid --archive value: {e}");
            return ExitCode::FAILURE;
        }
        None => None,
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc_handler(cancel) {
            error!("failed to install Ctrl-C handler: {e}");
        }
    }

    let on_log: webgrab::strategies::OnLog = Arc::new(|msg: &str| println!("{msg}"));
    let prompt: webgrab::strategies::Prompt = Arc::new(|kind: &str, message: &str| {
        print!("{message} ({kind}): ");
        use std::io::Write;
        std::io::stdout().flush().ok();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim().to_string()
    });

    let options = RunOptions {
        output_root: cli.out.clone(),
        proxy: cli.proxy,
        import_cookies_from: cli.import_cookies,
        interactive_login: cli.interactive_login,
        concurrency: cli.concurrency,
        on_log,
        prompt,
        cancel,
    };

    match orchestrator::run(&cli.url, options).await {
        Ok(tree) => {
            info!("retrieved {} file(s) into {}", tree.len(), cli.out.display());

            if let Some(format) = archive_format {
                match archive::write(&cli.out, format).await {
                    Ok(path) => println!("archived to {}", path.display()),
                    Err(e) => {
                        eprintln!("archiving failed: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("webgrab failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Wires `Ctrl-C` to the run's cancellation token so an interactive user
/// can stop a long capture cleanly, per spec §4.3.2's cancellation model.
fn ctrlc_handler(cancel: CancelToken) -> anyhow::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, cancelling run");
            cancel.cancel();
        }
    });
    Ok(())
}
