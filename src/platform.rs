//! Platform classifier (C3) — `classify(url) -> PlatformInfo`.
//!
//! Pure function over a static host-suffix table (longest-suffix match),
//! generalized from the teacher's `utils::url_utils` host-parsing helpers.
//! Falls back to an optional bounded HEAD probe, then `unknown`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::url_utils::extract_host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFamily {
    GitHosting,
    Paas,
    SshHosting,
    ContainerRegistry,
    CiCd,
    DomainRegistrar,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub id: String,
    pub family: PlatformFamily,
    pub name: String,
    pub external_tool: Option<String>,
}

impl PlatformInfo {
    fn unknown() -> Self {
        Self {
            id: "unknown".to_string(),
            family: PlatformFamily::Unknown,
            name: "unknown".to_string(),
            external_tool: None,
        }
    }
}

/// Static table of host suffixes. Longest match wins. Order is irrelevant —
/// `classify` always picks the entry with the longest matching suffix.
const PLATFORM_TABLE: &[(&str, &str, PlatformFamily, &str, Option<&str>)] = &[
    ("github.com", "github", PlatformFamily::GitHosting, "GitHub", Some("git")),
    ("gitlab.com", "gitlab", PlatformFamily::GitHosting, "GitLab", Some("git")),
    ("bitbucket.org", "bitbucket", PlatformFamily::GitHosting, "Bitbucket", Some("git")),
    ("codeberg.org", "codeberg", PlatformFamily::GitHosting, "Codeberg", Some("git")),
    ("sr.ht", "sourcehut", PlatformFamily::GitHosting, "SourceHut", Some("git")),
    ("vercel.app", "vercel", PlatformFamily::Paas, "Vercel", None),
    ("vercel.com", "vercel", PlatformFamily::Paas, "Vercel", None),
    ("netlify.app", "netlify", PlatformFamily::Paas, "Netlify", None),
    ("netlify.com", "netlify", PlatformFamily::Paas, "Netlify", None),
    ("herokuapp.com", "heroku", PlatformFamily::Paas, "Heroku", Some("heroku")),
    ("render.com", "render", PlatformFamily::Paas, "Render", None),
    ("onrender.com", "render", PlatformFamily::Paas, "Render", None),
    ("fly.dev", "fly_io", PlatformFamily::Paas, "Fly.io", None),
    ("ghcr.io", "ghcr", PlatformFamily::ContainerRegistry, "GitHub Container Registry", Some("docker")),
    ("docker.io", "docker_hub", PlatformFamily::ContainerRegistry, "Docker Hub", Some("docker")),
    ("hub.docker.com", "docker_hub", PlatformFamily::ContainerRegistry, "Docker Hub", Some("docker")),
    ("quay.io", "quay", PlatformFamily::ContainerRegistry, "Quay.io", Some("docker")),
    ("amazonaws.com", "ecr", PlatformFamily::ContainerRegistry, "Amazon ECR", Some("docker")),
    ("circleci.com", "circleci", PlatformFamily::CiCd, "CircleCI", None),
    ("travis-ci.com", "travis", PlatformFamily::CiCd, "Travis CI", None),
    ("namecheap.com", "namecheap", PlatformFamily::DomainRegistrar, "Namecheap", None),
    ("godaddy.com", "godaddy", PlatformFamily::DomainRegistrar, "GoDaddy", None),
];

/// `ssh://` scheme always classifies as `ssh_hosting` regardless of host,
/// since any host may be configured as an SSH-accessible source.
fn classify_scheme(url: &str) -> Option<PlatformInfo> {
    if url.starts_with("ssh://") || url.starts_with("git+ssh://") {
        return Some(PlatformInfo {
            id: "ssh".to_string(),
            family: PlatformFamily::SshHosting,
            name: "SSH".to_string(),
            external_tool: Some("scp".to_string()),
        });
    }
    None
}

fn longest_suffix_match(host: &str) -> Option<PlatformInfo> {
    let host = host.split(':').next().unwrap_or(host);
    PLATFORM_TABLE
        .iter()
        .filter(|(suffix, ..)| host == *suffix || host.ends_with(&format!(".{suffix}")))
        .max_by_key(|(suffix, ..)| suffix.len())
        .map(|(_, id, family, name, tool)| PlatformInfo {
            id: (*id).to_string(),
            family: *family,
            name: (*name).to_string(),
            external_tool: tool.map(str::to_string),
        })
}

/// Bounded HEAD probe used only when the suffix table has no match.
/// Inspects the `Server` header; never blocks longer than 5s; any failure
/// falls back to `unknown`.
async fn probe_head(url: &str) -> PlatformInfo {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .danger_accept_invalid_certs(true)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            warn!("failed to build probe client: {e}");
            return PlatformInfo::unknown();
        }
    };

    match client.head(url).send().await {
        Ok(resp) => {
            if let Some(server) = resp.headers().get("server").and_then(|v| v.to_str().ok()) {
                let server = server.to_lowercase();
                if server.contains("github") {
                    return PlatformInfo {
                        id: "github".to_string(),
                        family: PlatformFamily::GitHosting,
                        name: "GitHub".to_string(),
                        external_tool: Some("git".to_string()),
                    };
                }
                if server.contains("vercel") {
                    return PlatformInfo {
                        id: "vercel".to_string(),
                        family: PlatformFamily::Paas,
                        name: "Vercel".to_string(),
                        external_tool: None,
                    };
                }
            }
            debug!("HEAD probe for {url} found no recognizable Server header");
            PlatformInfo::unknown()
        }
        Err(e) => {
            debug!("HEAD probe for {url} failed: {e}");
            PlatformInfo::unknown()
        }
    }
}

/// Classify a URL into a `PlatformInfo`. Never blocks for longer than ~5s
/// and always returns — falling back to `family = unknown` on any failure.
pub async fn classify(url: &str) -> PlatformInfo {
    if let Some(info) = classify_scheme(url) {
        return info;
    }

    let host = match extract_host(url) {
        Ok(h) => h,
        Err(e) => {
            warn!("classify: could not extract host from {url}: {e}");
            return PlatformInfo::unknown();
        }
    };

    if let Some(info) = longest_suffix_match(&host) {
        return info;
    }

    probe_head(url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifies_github_by_suffix() {
        let info = classify("https://github.com/foo/bar").await;
        assert_eq!(info.family, PlatformFamily::GitHosting);
        assert_eq!(info.id, "github");
    }

    #[tokio::test]
    async fn classifies_subdomain_by_longest_suffix() {
        let info = classify("https://my-app.vercel.app/").await;
        assert_eq!(info.family, PlatformFamily::Paas);
        assert_eq!(info.id, "vercel");
    }

    #[tokio::test]
    async fn ssh_scheme_always_ssh_hosting() {
        let info = classify("ssh://git@example.com/repo.git").await;
        assert_eq!(info.family, PlatformFamily::SshHosting);
    }

    #[tokio::test]
    async fn unrecognized_host_falls_back_to_unknown_on_probe_failure() {
        let info = classify("https://this-host-does-not-resolve.invalid/").await;
        assert_eq!(info.family, PlatformFamily::Unknown);
    }
}
