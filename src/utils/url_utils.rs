//! URL validation and host-extraction helpers shared by the classifier,
//! collector, and session provider.

use url::Url;

/// Check if a URL is one the collector should ever enqueue or fetch.
///
/// Filters out `data:`, `javascript:`, `mailto:`, and `#`-only fragment
/// references per spec §4.3.5, and restricts to `http`/`https` schemes.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() || url.starts_with('#') {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Extract the host (with port, if non-default) from a URL string.
pub fn extract_host(url: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(url).map_err(|e| anyhow::anyhow!("failed to parse URL: {e}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL has no host"))?;
    match parsed.port() {
        Some(port) => Ok(format!("{host}:{port}")),
        None => Ok(host.to_string()),
    }
}
