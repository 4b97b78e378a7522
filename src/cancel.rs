//! Cancellation primitive shared by the collector, strategies, and orchestrator.

use tokio_util::sync::CancellationToken;

/// A set-once flag observable from any worker. Setting it is terminal for the run.
///
/// Wraps `tokio_util::sync::CancellationToken` rather than a bare `AtomicBool`
/// so that workers can `tokio::select!` against it instead of polling in a
/// tight loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(CancellationToken);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self(CancellationToken::new())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once the token has been cancelled. Intended for use in a
    /// `tokio::select!` alongside a periodic interval tick.
    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}
