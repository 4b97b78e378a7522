//! Crate-wide error taxonomy.

/// Errors surfaced across the orchestrator/strategy boundary.
///
/// Per-URL failures inside the asset collector never become a `GrabError` —
/// they are recorded as a `Resource` with an http status and the run
/// continues. This enum only carries failures that are terminal for a
/// whole strategy invocation.
#[derive(thiserror::Error, Debug)]
pub enum GrabError {
    #[error("classification failed: {0}")]
    Classification(String),

    #[error("authentication required for {platform}")]
    AuthRequired { platform: String },

    #[error("required external tool not found: {tool} ({hint})")]
    MissingTool { tool: String, hint: String },

    #[error("cancelled")]
    Cancelled,

    #[error("strategy failed: {0}")]
    Strategy(#[from] anyhow::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GrabError>;
