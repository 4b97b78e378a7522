//! `webgrab` — classifies a project URL's hosting platform and dispatches
//! to the matching acquisition strategy: git clone, SSH pull, PaaS API,
//! container registry pull, or a concurrent recursive website asset
//! collector as the universal fallback.

pub mod archive;
pub mod audit;
pub mod browser_setup;
pub mod cancel;
pub mod collector;
pub mod config;
pub mod credentials;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod platform;
pub mod retry;
pub mod session;
pub mod strategies;
pub mod utils;

pub use archive::{write as write_archive, ArchiveFormat};
pub use cancel::CancelToken;
pub use collector::types::{FileTree, Resource, ResourceKind};
pub use config::Config;
pub use credentials::CredentialStore;
pub use error::{GrabError, Result};
pub use manifest::Manifest;
pub use orchestrator::{default_options, run, RunOptions};
pub use platform::{classify, PlatformFamily, PlatformInfo};
pub use retry::retry_failed;
pub use session::{Session, SessionProvider};
