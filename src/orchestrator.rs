//! Orchestrator (C7) — classify, select, supply resources, enforce
//! cancellation, guarantee cleanup, per spec §4.5.
//!
//! Implements the documented pseudocode directly: classify → resolve a
//! session for the URL's host → pick a strategy from the family→strategy
//! table → await its `download()` → unconditionally close any browser the
//! session provider opened. Rust has no `finally`, so the unconditional
//! teardown is expressed as a guard run after the `match` on every path,
//! mirroring the teacher's `Drop`-guard style used for browser profile
//! cleanup in `browser_setup`/`collector::render`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::audit::AuditTrail;
use crate::cancel::CancelToken;
use crate::collector::types::FileTree;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{GrabError, Result};
use crate::platform::{self, PlatformFamily};
use crate::session::SessionProvider;
use crate::strategies::{strategy_for, OnLog, Prompt, StrategyContext};
use crate::utils::url_utils::extract_host;

/// Resources the orchestrator gathers before invoking a strategy, mirroring
/// the Python orchestrator's `ConfigManager`/`SessionManager` construction.
pub struct RunOptions {
    pub output_root: PathBuf,
    pub proxy: Option<String>,
    pub import_cookies_from: Option<String>,
    pub interactive_login: bool,
    /// Overrides the asset collector's worker pool size (§4.3.2) for this
    /// run. `None` keeps whatever `config.json` already has on disk.
    pub concurrency: Option<usize>,
    pub on_log: OnLog,
    pub prompt: Prompt,
    pub cancel: CancelToken,
}

/// Runs the full classify → select → execute → cleanup pipeline for `url`,
/// per spec §4.5. Returns the resulting `FileTree`; an empty tree on
/// cancellation (not an error), per spec §7.
pub async fn run(url: &str, options: RunOptions) -> Result<FileTree> {
    let RunOptions {
        output_root,
        proxy,
        import_cookies_from,
        interactive_login,
        concurrency,
        on_log,
        prompt,
        cancel,
    } = options;

    tokio::fs::create_dir_all(&output_root)
        .await
        .map_err(GrabError::Io)?;

    let audit = Arc::new(
        AuditTrail::open(&output_root)
            .await
            .map_err(GrabError::Strategy)?,
    );
    audit.record(&format!("run started for {url}")).await;

    let credentials = Arc::new(
        CredentialStore::open(&output_root)
            .await
            .map_err(GrabError::Strategy)?,
    );
    let config_path = crate::config::default_path(&output_root);
    let mut config = Config::load_or_create(&config_path)
        .await
        .map_err(GrabError::Strategy)?;
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
    }
    let proxy = proxy.or_else(|| config.proxy().map(str::to_string));
    config.general.proxy = proxy.clone();

    on_log(&format!("analyzing URL: {url}"));
    let platform_info = platform::classify(url).await;
    on_log(&format!("detected platform: {}", platform_info.name));
    audit
        .record(&format!(
            "classified {url} as {} ({:?})",
            platform_info.id, platform_info.family
        ))
        .await;

    let host = extract_host(url).map_err(|e| GrabError::Classification(e.to_string()))?;

    let session_provider = SessionProvider::new(Arc::clone(&credentials));

    // `browser_session` is Some only when `interactive_login` opened one;
    // it is the handle the REDESIGN FLAG in spec §9 moves out to the
    // orchestrator's ownership, closed unconditionally below.
    let mut browser_session = None;

    if let Some(browser_id) = import_cookies_from.as_deref() {
        on_log(&format!("importing cookies from {browser_id} for {host}"));
        match session_provider.import_from_browser(browser_id, &host).await {
            Ok(found) => {
                if !found {
                    warn!("no cookies found for {host} in {browser_id}");
                }
            }
            Err(e) => warn!("cookie import from {browser_id} failed: {e}"),
        }
    }

    if interactive_login {
        on_log(&format!("opening interactive login for {url}"));
        match session_provider.interactive_login(url, &host).await {
            Ok((_, handle)) => browser_session = Some(handle),
            Err(e) => warn!("interactive login failed: {e}"),
        }
    }

    let session = session_provider.for_domain(&host).await;

    let strategy = strategy_for(platform_info.family);
    on_log(&format!("selected strategy for family {:?}", platform_info.family));

    let ctx = StrategyContext {
        url: url.to_string(),
        output_root: output_root.clone(),
        config,
        session,
        credentials,
        platform: platform_info.clone(),
        on_log: on_log.clone(),
        prompt,
        cancel: cancel.clone(),
    };

    let outcome = strategy.download(&ctx).await;

    // Unconditional cleanup: the orchestrator owns any browser opened by
    // interactive login, regardless of how the strategy finished.
    if let Some(handle) = browser_session {
        handle.close().await;
    }

    match outcome {
        Ok(tree) => {
            audit
                .record(&format!("run completed for {url}: {} files", tree.len()))
                .await;
            info!("run completed: {} files", tree.len());
            Ok(tree)
        }
        Err(GrabError::Cancelled) => {
            audit.record(&format!("run cancelled for {url}")).await;
            info!("run cancelled for {url}");
            Ok(FileTree::new())
        }
        Err(e) => {
            audit.record(&format!("run failed for {url}: {e}")).await;
            error!("run failed for {url}: {e}");
            Err(e)
        }
    }
}

/// Convenience constructor for a `RunOptions` with only the mandatory
/// fields set and sensible logging/prompt defaults (stdout log, a prompt
/// that fails closed rather than blocking on stdin in non-interactive
/// contexts). Front-ends that need real interaction supply their own
/// `on_log`/`prompt`.
#[must_use]
pub fn default_options(output_root: &Path, cancel: CancelToken) -> RunOptions {
    RunOptions {
        output_root: output_root.to_path_buf(),
        proxy: None,
        import_cookies_from: None,
        interactive_login: false,
        concurrency: None,
        on_log: Arc::new(|msg: &str| info!("{msg}")),
        prompt: Arc::new(|kind: &str, message: &str| {
            warn!("prompt for {kind} ({message}) has no interactive handler; returning empty");
            String::new()
        }),
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_before_start_returns_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut options = default_options(dir.path(), cancel);
        options.output_root = dir.path().to_path_buf();

        // An unresolvable host still classifies to `unknown` and routes to
        // the website strategy, which observes cancellation immediately.
        let result = run("https://this-host-does-not-resolve.invalid/", options).await;
        assert!(result.unwrap().is_empty());
    }
}
