//! Shared constants used throughout the crate to avoid magic numbers.

/// Worker pool size for the asset collector, per spec §4.3.2.
pub const DEFAULT_WORKER_COUNT: usize = 20;

/// Hard timeout for browser navigation / wait-for-network-idle (§4.3.1, §5).
pub const NAVIGATION_TIMEOUT_SECS: u64 = 60;

/// Per-fetch HTTP timeout (§4.3.3, §5).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Per-subprocess timeout ceiling for external tools (§5).
pub const SUBPROCESS_TIMEOUT_SECS: u64 = 70;

/// Retry utility stage-3 subprocess timeout (§4.6).
pub const RETRY_SUBPROCESS_TIMEOUT_SECS: u64 = 60;

/// Cancellation observer poll interval (§4.3.2).
pub const CANCEL_POLL_INTERVAL_MS: u64 = 500;

/// Path segments longer than this are hashed (§4.3.4).
pub const MAX_SEGMENT_LEN: usize = 50;

/// Chrome user agent string for the rendering browser.
///
/// Updated: 2025-01-29 to Chrome 132 (current stable).
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
