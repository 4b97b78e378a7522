//! Website-capture strategy (C6) — the fallback for any platform family the
//! others don't claim, per spec §4.4 and §4.5.
//!
//! Thin adapter: obtain cookies from C4 (already resolved onto
//! `StrategyContext::session` by the orchestrator), hand the URL to the
//! collector (C5), and convert its `Resource` map into a `FileTree`.
//! Grounded on the original source's `strategies/website_strategy.py`,
//! which does exactly this and nothing else.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Strategy, StrategyContext};
use crate::collector::capture;
use crate::collector::types::FileTree;
use crate::error::GrabError;
use crate::manifest::Manifest;

pub struct WebsiteCaptureStrategy;

#[async_trait]
impl Strategy for WebsiteCaptureStrategy {
    async fn download(&self, ctx: &StrategyContext) -> Result<FileTree, GrabError> {
        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        (ctx.on_log)(&format!("capturing website {}", ctx.url));

        let on_file_log = ctx.on_log.clone();
        let on_file = std::sync::Arc::new(move |relative: &str| {
            on_file_log(&format!("saved {relative}"));
        });

        let resources = capture(
            &ctx.url,
            &ctx.output_root,
            ctx.session.as_ref(),
            ctx.config.proxy(),
            ctx.config.concurrency,
            ctx.cancel.clone(),
            on_file,
        )
        .await
        .map_err(GrabError::Strategy)?;

        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        info!("website capture complete: {} resources", resources.len());

        // Only this strategy retains per-URL Resource detail (http_status,
        // kind), so it is the one that writes the manifest C8's retry
        // ladder reads back — git/ssh/paas/container strategies are atomic,
        // single-artifact operations with nothing per-URL to report.
        let manifest = Manifest::build(&ctx.url, ctx.platform.clone(), &resources);
        if let Err(e) = manifest.write(&ctx.output_root).await {
            warn!("failed to write manifest for {}: {e}", ctx.url);
        }

        let mut tree = FileTree::new();
        for resource in resources.values() {
            if let Some(save_path) = &resource.save_path {
                if let Ok(relative) = save_path.strip_prefix(&ctx.output_root) {
                    tree.insert(
                        relative.to_string_lossy().to_string(),
                        "website_capture".to_string(),
                    );
                }
            }
        }
        Ok(tree)
    }
}
