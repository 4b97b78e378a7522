//! Strategy set (C6) — family-specific acquirers, per spec §4.4.

pub mod container;
pub mod git;
pub mod paas;
pub mod ssh;
pub mod website;

use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::collector::types::FileTree;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::GrabError;
use crate::platform::PlatformInfo;
use crate::session::Session;

/// Secret prompt callable, per spec §6.2 ("Prompt interface"). Must not
/// echo the returned secret anywhere it could be logged.
pub type Prompt = std::sync::Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Log-line sink the orchestrator owns and passes down to strategies.
pub type OnLog = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

pub struct StrategyContext {
    pub url: String,
    pub output_root: std::path::PathBuf,
    pub config: Config,
    pub session: Option<Session>,
    pub credentials: std::sync::Arc<CredentialStore>,
    pub platform: PlatformInfo,
    pub on_log: OnLog,
    pub prompt: Prompt,
    pub cancel: CancelToken,
}

/// Every strategy exposes the same shape (§4.4): constructed with shared
/// run context, producing a `FileTree` or a terminal `GrabError`.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn download(&self, ctx: &StrategyContext) -> Result<FileTree, GrabError>;
}

/// Mapping from platform family to strategy, per spec §4.5.
#[must_use]
pub fn strategy_for(family: crate::platform::PlatformFamily) -> Box<dyn Strategy> {
    use crate::platform::PlatformFamily;
    match family {
        PlatformFamily::GitHosting => Box::new(git::GitStrategy),
        PlatformFamily::SshHosting => Box::new(ssh::SshStrategy),
        PlatformFamily::Paas => Box::new(paas::PaasStrategy),
        PlatformFamily::ContainerRegistry => Box::new(container::ContainerStrategy),
        _ => Box::new(website::WebsiteCaptureStrategy),
    }
}
