//! Per-URL fetch + materialize step, per spec §4.3.3.

use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::save_path::derive_save_path;
use super::types::{Resource, ResourceKind};

/// Derive `ResourceKind` from a `Content-Type` header value, falling back
/// to the path extension, per spec §4.3.3 item 3.
#[must_use]
pub fn kind_from_content_type(content_type: Option<&str>, url: &str) -> ResourceKind {
    if let Some(ct) = content_type {
        let ct = ct.to_lowercase();
        if ct.contains("html") {
            return ResourceKind::Html;
        }
        if ct.contains("css") {
            return ResourceKind::Css;
        }
        if ct.contains("javascript") || ct.contains("ecmascript") {
            return ResourceKind::Js;
        }
        if ct.starts_with("image/") {
            return ResourceKind::Image;
        }
        if ct.starts_with("font/") || ct.contains("font-woff") || ct.contains("opentype") {
            return ResourceKind::Font;
        }
    }
    kind_from_extension(url)
}

fn kind_from_extension(url: &str) -> ResourceKind {
    let Ok(parsed) = url::Url::parse(url) else {
        return ResourceKind::Unknown;
    };
    let ext = Path::new(parsed.path())
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "js" | "mjs" => ResourceKind::Js,
        "css" => ResourceKind::Css,
        "html" | "htm" => ResourceKind::Html,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif" => ResourceKind::Image,
        "woff" | "woff2" | "ttf" | "eot" | "otf" => ResourceKind::Font,
        _ => ResourceKind::Unknown,
    }
}

/// Fetches one URL and materializes its body to disk at the derived save
/// path, returning a finalized `Resource`. Never raises: fetch, save, or
/// parse-precursor errors become a `Resource` with `status = 500` per
/// spec §4.3.7.
pub async fn fetch_one(client: &reqwest::Client, output_root: &Path, url: &str) -> Resource {
    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("fetch failed for {url}: {e}");
            return Resource::download_error(url.to_string(), 500);
        }
    };

    let status = response.status().as_u16() as i32;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => {
            warn!("failed to read response body for {url}: {e}");
            return Resource::download_error(url.to_string(), 500);
        }
    };

    let kind = kind_from_content_type(content_type.as_deref(), url);
    let save_path = derive_save_path(output_root, url, kind);

    match materialize(&save_path, &bytes).await {
        Ok(()) => {
            debug!("saved {url} -> {}", save_path.display());
            Resource {
                url: url.to_string(),
                kind,
                bytes: Some(bytes.to_vec()),
                http_status: status,
                save_path: Some(save_path),
            }
        }
        Err(e) => {
            warn!("failed to save {url} to disk: {e}");
            Resource {
                url: url.to_string(),
                kind,
                bytes: Some(bytes.to_vec()),
                http_status: status,
                save_path: None,
            }
        }
    }
}

/// Atomic write: a `NamedTempFile` created alongside the destination,
/// then persisted over it. Lifted from the teacher's
/// `content_saver::compression::save_compressed_file` pattern, without the
/// compression/caching metadata that pattern also carries.
async fn materialize(save_path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = save_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("save path has no parent"))?;
    tokio::fs::create_dir_all(parent).await?;

    let bytes = bytes.to_vec();
    let parent = parent.to_path_buf();
    let save_path = save_path.to_path_buf();

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new_in(&parent)?;
        std::io::Write::write_all(&mut tmp, &bytes)?;
        tmp.persist(&save_path)?;
        Ok(())
    })
    .await??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_html_wins_over_extension() {
        let kind = kind_from_content_type(Some("text/html; charset=utf-8"), "https://e.com/a.php");
        assert_eq!(kind, ResourceKind::Html);
    }

    #[test]
    fn falls_back_to_extension_when_no_content_type() {
        let kind = kind_from_content_type(None, "https://e.com/a.css");
        assert_eq!(kind, ResourceKind::Css);
    }

    #[test]
    fn unknown_extension_and_no_content_type() {
        let kind = kind_from_content_type(None, "https://e.com/api/data");
        assert_eq!(kind, ResourceKind::Unknown);
    }
}
