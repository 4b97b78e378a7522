//! Data types produced by the asset collector (C5), per spec §3.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Html,
    Css,
    Js,
    Image,
    Font,
    Unknown,
    Cancelled,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Html => "html",
            ResourceKind::Css => "css",
            ResourceKind::Js => "js",
            ResourceKind::Image => "image",
            ResourceKind::Font => "font",
            ResourceKind::Unknown => "unknown",
            ResourceKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One fetched URL's outcome. Invariants (§3): at most one `Resource` per
/// URL within a run; `save_path` is set iff bytes were written; `kind =
/// Html` only if parsed as HTML; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub kind: ResourceKind,
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    pub http_status: i32,
    pub save_path: Option<PathBuf>,
}

impl Resource {
    #[must_use]
    pub fn cancelled(url: String) -> Self {
        Self {
            url,
            kind: ResourceKind::Cancelled,
            bytes: None,
            http_status: -1,
            save_path: None,
        }
    }

    #[must_use]
    pub fn download_error(url: String, status: i32) -> Self {
        Self {
            url,
            kind: ResourceKind::Unknown,
            bytes: None,
            http_status: status,
            save_path: None,
        }
    }
}

/// Mapping (relative path from output root) -> free-form origin tag.
/// Returned to callers; never persisted by the collector itself.
pub type FileTree = HashMap<String, String>;
