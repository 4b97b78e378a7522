//! Manifest writer (C10, added) — JSON record of per-URL outcomes,
//! consumed by the retry utility (C8), per spec §4.8.
//!
//! Grounded on the original source's `output/manifest_gen.py`
//! (`by_type`/`by_source` tallies alongside the flat resource list) plus
//! `tools/retry_failed.py`'s `load_manifest`, which reads back a
//! `failed_urls` key this writer is therefore responsible for populating.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::collector::types::{Resource, ResourceKind};
use crate::platform::PlatformInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResource {
    pub url: String,
    pub kind: ResourceKind,
    pub http_status: i32,
    pub save_path: Option<String>,
}

impl From<&Resource> for ManifestResource {
    fn from(resource: &Resource) -> Self {
        Self {
            url: resource.url.clone(),
            kind: resource.kind,
            http_status: resource.http_status,
            save_path: resource
                .save_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }
}

/// A successful HTTP status is any 2xx; anything else (including the
/// collector's `-1` cancelled sentinel and `500` download-error sentinel)
/// counts as failed for retry purposes, per spec §4.3.3/§4.6.
fn is_success(status: i32) -> bool {
    (200..300).contains(&status)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub url: String,
    pub platform: PlatformInfo,
    pub total_resources: usize,
    pub resources: Vec<ManifestResource>,
    pub by_type: HashMap<String, usize>,
    pub failed_urls: Vec<String>,
}

impl Manifest {
    /// Builds a manifest from a run's resource map, per spec §4.8's schema.
    #[must_use]
    pub fn build(url: &str, platform: PlatformInfo, resources: &HashMap<String, Resource>) -> Self {
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut failed_urls = Vec::new();
        let mut entries: Vec<ManifestResource> = resources
            .values()
            .map(|resource| {
                *by_type.entry(resource.kind.to_string()).or_insert(0) += 1;
                if !is_success(resource.http_status) {
                    failed_urls.push(resource.url.clone());
                }
                ManifestResource::from(resource)
            })
            .collect();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        failed_urls.sort();

        Self {
            url: url.to_string(),
            platform,
            total_resources: entries.len(),
            resources: entries,
            by_type,
            failed_urls,
        }
    }

    fn path(output_root: &Path) -> std::path::PathBuf {
        output_root.join("manifest.json")
    }

    /// Serializes this manifest to `<output_root>/manifest.json`.
    pub async fn write(&self, output_root: &Path) -> Result<()> {
        let path = Self::path(output_root);
        let raw = serde_json::to_string_pretty(self).context("serializing manifest")?;
        tokio::fs::write(&path, raw)
            .await
            .with_context(|| format!("writing manifest at {}", path.display()))?;
        Ok(())
    }

    /// Loads a previously-written manifest for the retry utility (C8).
    pub async fn load(output_root: &Path) -> Result<Self> {
        let path = Self::path(output_root);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading manifest at {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing manifest at {}", path.display()))
    }

    #[must_use]
    pub fn failed_urls(&self) -> Vec<String> {
        self.failed_urls.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformFamily;

    fn sample_platform() -> PlatformInfo {
        PlatformInfo {
            id: "unknown".to_string(),
            family: PlatformFamily::Unknown,
            name: "unknown".to_string(),
            external_tool: None,
        }
    }

    #[test]
    fn tallies_by_type_and_collects_failed_urls() {
        let mut resources = HashMap::new();
        resources.insert(
            "https://e.com/a.html".to_string(),
            Resource {
                url: "https://e.com/a.html".to_string(),
                kind: ResourceKind::Html,
                bytes: None,
                http_status: 200,
                save_path: Some("out/e.com/a.html".into()),
            },
        );
        resources.insert(
            "https://e.com/b.png".to_string(),
            Resource {
                url: "https://e.com/b.png".to_string(),
                kind: ResourceKind::Unknown,
                bytes: None,
                http_status: 500,
                save_path: None,
            },
        );

        let manifest = Manifest::build("https://e.com/", sample_platform(), &resources);
        assert_eq!(manifest.total_resources, 2);
        assert_eq!(manifest.by_type.get("html"), Some(&1));
        assert_eq!(manifest.failed_urls, vec!["https://e.com/b.png".to_string()]);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let resources = HashMap::new();
        let manifest = Manifest::build("https://e.com/", sample_platform(), &resources);
        manifest.write(dir.path()).await.unwrap();

        let loaded = Manifest::load(dir.path()).await.unwrap();
        assert_eq!(loaded.url, "https://e.com/");
    }
}
