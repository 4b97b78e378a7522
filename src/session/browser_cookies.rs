//! Direct on-disk cookie store reads for locally-installed browsers (C4).
//!
//! Chromium-family browsers (chrome, edge, brave) share the `Cookies`
//! SQLite schema; Firefox uses `cookies.sqlite`. Grounded on
//! `monokrome-foiacquire`'s `rusqlite` dependency, since the teacher itself
//! has no direct SQLite dependency in its session-handling code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::warn;

use super::Cookie;

/// Supported browser identifiers for `import_from_browser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserId {
    Chrome,
    Firefox,
    Edge,
    Brave,
}

impl std::str::FromStr for BrowserId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "edge" => Ok(Self::Edge),
            "brave" => Ok(Self::Brave),
            other => Err(anyhow::anyhow!("unsupported browser identifier: {other}")),
        }
    }
}

fn chromium_profile_paths(browser: BrowserId) -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_default();
    let candidates: &[&str] = match browser {
        BrowserId::Chrome => &[
            ".config/google-chrome/Default/Cookies",
            "Library/Application Support/Google/Chrome/Default/Cookies",
            "AppData/Local/Google/Chrome/User Data/Default/Cookies",
        ],
        BrowserId::Edge => &[
            ".config/microsoft-edge/Default/Cookies",
            "Library/Application Support/Microsoft Edge/Default/Cookies",
            "AppData/Local/Microsoft/Edge/User Data/Default/Cookies",
        ],
        BrowserId::Brave => &[
            ".config/BraveSoftware/Brave-Browser/Default/Cookies",
            "Library/Application Support/BraveSoftware/Brave-Browser/Default/Cookies",
            "AppData/Local/BraveSoftware/Brave-Browser/User Data/Default/Cookies",
        ],
        BrowserId::Firefox => &[],
    };
    candidates.iter().map(|p| home.join(p)).collect()
}

fn firefox_profile_paths() -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_default();
    let roots = [
        home.join(".mozilla/firefox"),
        home.join("Library/Application Support/Firefox/Profiles"),
        home.join("AppData/Roaming/Mozilla/Firefox/Profiles"),
    ];
    let mut out = Vec::new();
    for root in roots {
        let Ok(entries) = std::fs::read_dir(&root) else {
            continue;
        };
        for entry in entries.flatten() {
            let candidate = entry.path().join("cookies.sqlite");
            if candidate.exists() {
                out.push(candidate);
            }
        }
    }
    out
}

/// Chromium's `v10`/`v11` cookie-value prefix means the value is encrypted
/// with an OS-keyring-derived key we do not have access to from a plain
/// file read. Per spec §4.2, undecryptable cookies are skipped with a
/// warning rather than failing the whole import.
fn is_encrypted_chromium_value(raw: &[u8]) -> bool {
    raw.starts_with(b"v10") || raw.starts_with(b"v11")
}

fn read_chromium_cookies(db_path: &PathBuf, target_host: &str) -> Result<Vec<Cookie>> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening cookie store {}", db_path.display()))?;

    let mut stmt = conn
        .prepare(
            "SELECT name, value, encrypted_value, host_key, path, expires_utc, is_httponly, is_secure FROM cookies",
        )
        .context("preparing chromium cookie query")?;

    let rows = stmt
        .query_map([], |row| {
            let name: String = row.get(0)?;
            let value: String = row.get(1)?;
            let encrypted_value: Vec<u8> = row.get(2)?;
            let host_key: String = row.get(3)?;
            let path: String = row.get(4)?;
            let expires_utc: i64 = row.get(5)?;
            let is_httponly: i64 = row.get(6)?;
            let is_secure: i64 = row.get(7)?;
            Ok((
                name,
                value,
                encrypted_value,
                host_key,
                path,
                expires_utc,
                is_httponly != 0,
                is_secure != 0,
            ))
        })
        .context("querying chromium cookies")?;

    let mut out = Vec::new();
    for row in rows {
        let (name, value, encrypted_value, host_key, path, expires_utc, http_only, secure) =
            row.context("reading cookie row")?;

        if !domain_matches(&host_key, target_host) {
            continue;
        }

        let resolved_value = if !value.is_empty() {
            value
        } else if is_encrypted_chromium_value(&encrypted_value) {
            warn!("skipping undecryptable cookie {name} for {host_key}: encrypted at rest");
            continue;
        } else {
            String::from_utf8_lossy(&encrypted_value).to_string()
        };

        out.push(Cookie {
            name,
            value: resolved_value,
            domain: host_key,
            path,
            expires: Some(expires_utc),
            http_only,
            secure,
        });
    }

    Ok(out)
}

fn read_firefox_cookies(db_path: &PathBuf, target_host: &str) -> Result<Vec<Cookie>> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening cookie store {}", db_path.display()))?;

    let mut stmt = conn
        .prepare("SELECT name, value, host, path, expiry, isHttpOnly, isSecure FROM moz_cookies")
        .context("preparing firefox cookie query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(Cookie {
                name: row.get(0)?,
                value: row.get(1)?,
                domain: row.get(2)?,
                path: row.get(3)?,
                expires: Some(row.get(4)?),
                http_only: row.get::<_, i64>(5)? != 0,
                secure: row.get::<_, i64>(6)? != 0,
            })
        })
        .context("querying firefox cookies")?;

    let mut out = Vec::new();
    for row in rows {
        let cookie = row.context("reading cookie row")?;
        if domain_matches(&cookie.domain, target_host) {
            out.push(cookie);
        }
    }
    Ok(out)
}

/// A cookie's domain matches the target host if it's an exact match or the
/// target host is a subdomain of it (`.example.com` matches `www.example.com`).
fn domain_matches(cookie_domain: &str, target_host: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.');
    target_host == cookie_domain || target_host.ends_with(&format!(".{cookie_domain}"))
}

/// Reads cookies for `target_host` from the named browser's local profile.
/// Fails soft: returns `Ok(vec![])` if no profile is found, matching the
/// "returns boolean found-any" contract at the call site.
pub fn read_cookies(browser: BrowserId, target_host: &str) -> Result<Vec<Cookie>> {
    let profile_paths = match browser {
        BrowserId::Firefox => firefox_profile_paths(),
        other => chromium_profile_paths(other),
    };

    for path in profile_paths {
        if !path.exists() {
            continue;
        }
        // SQLite databases may be locked by a running browser; copy to a
        // scratch location first so a live browser process never blocks us.
        let scratch = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => {
                warn!("failed to create scratch cookie copy: {e}");
                continue;
            }
        };
        if std::fs::copy(&path, scratch.path()).is_err() {
            continue;
        }

        let result = match browser {
            BrowserId::Firefox => read_firefox_cookies(&scratch.path().to_path_buf(), target_host),
            _ => read_chromium_cookies(&scratch.path().to_path_buf(), target_host),
        };

        match result {
            Ok(cookies) if !cookies.is_empty() => return Ok(cookies),
            Ok(_) => continue,
            Err(e) => {
                warn!("failed to read cookies from {}: {e}", path.display());
                continue;
            }
        }
    }

    Ok(Vec::new())
}
