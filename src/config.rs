//! On-disk run configuration (`config.json`).
//!
//! Mirrors the teacher's `CrawlConfig` split: a serde-derived struct with
//! documented defaults, loaded once per run and cloned cheaply into workers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::constants::DEFAULT_WORKER_COUNT;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GitStrategyConfig {
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SshStrategyConfig {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub remote_path: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HerokuConfig {
    #[serde(default)]
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PaasStrategyConfig {
    #[serde(default)]
    pub heroku: HerokuConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GeneralConfig {
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Recognized keys of `config.json`, as specified in §6.2. Missing file
/// triggers creation with these (all-empty) defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub git_strategy: GitStrategyConfig,
    #[serde(default)]
    pub ssh_strategy: SshStrategyConfig,
    #[serde(default)]
    pub paas_strategy: PaasStrategyConfig,
    #[serde(default)]
    pub general: GeneralConfig,

    /// Worker pool size for the asset collector (§4.3.2), default 20.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    DEFAULT_WORKER_COUNT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_strategy: GitStrategyConfig::default(),
            ssh_strategy: SshStrategyConfig::default(),
            paas_strategy: PaasStrategyConfig::default(),
            general: GeneralConfig::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl Config {
    /// Loads `config.json` at `path`, creating it with documented defaults
    /// if absent.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let config: Config = serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config at {}", path.display()))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.save(path).await?;
                Ok(config)
            }
            Err(e) => Err(e).with_context(|| format!("reading config at {}", path.display())),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let raw = serde_json::to_string_pretty(self).context("serializing config")?;
        tokio::fs::write(path, raw)
            .await
            .with_context(|| format!("writing config at {}", path.display()))?;
        Ok(())
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.general.proxy.as_deref()
    }
}

/// Default path for the configuration file under an output root.
#[must_use]
pub fn default_path(output_root: &Path) -> PathBuf {
    output_root.join("config.json")
}
