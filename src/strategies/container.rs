//! Container-registry strategy (C6), per spec §4.4.
//!
//! `docker pull` + `docker save` + tar extraction into the output root.
//! Grounded on the original source's `strategies/container_strategy.py`
//! (image-name heuristic, tar-to-disk extraction) and the teacher's
//! `tokio::process::Command` usage pattern already established in
//! `strategies::paas::download_heroku`.

use async_trait::async_trait;
use tracing::info;

use super::{Strategy, StrategyContext};
use crate::collector::types::FileTree;
use crate::error::GrabError;

pub struct ContainerStrategy;

/// Heuristic image-name extraction from a registry URL's path, per the
/// original source's `_get_image_name_from_url`: a Docker Hub `/r/...`
/// path strips that prefix, everything else is used verbatim, both tagged
/// `:latest` when no tag is already present.
fn image_name_from_url(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    let stripped = path
        .split("/r/")
        .next_back()
        .unwrap_or(&path)
        .trim_start_matches('/')
        .to_string();

    if stripped.contains(':') {
        stripped
    } else {
        format!("{stripped}:latest")
    }
}

#[async_trait]
impl Strategy for ContainerStrategy {
    async fn download(&self, ctx: &StrategyContext) -> Result<FileTree, GrabError> {
        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        let cli_tool = ctx.platform.external_tool.as_deref().unwrap_or("docker");
        which::which(cli_tool).map_err(|_| GrabError::MissingTool {
            tool: cli_tool.to_string(),
            hint: format!("install {cli_tool}: https://docs.docker.com/engine/install/"),
        })?;

        let image = image_name_from_url(&ctx.url);
        (ctx.on_log)(&format!("pulling container image {image} via {cli_tool}"));

        // Per spec §9's Open Question resolution: no token present means no
        // registry login attempt, matching the original's silent skip.
        if let Some(token) = ctx.credentials.get(&ctx.platform.id).await {
            info!(
                "credential present for {}, but registry login is not yet wired for non-ECR registries",
                ctx.platform.id
            );
            let _ = token;
        }

        let pull = tokio::process::Command::new(cli_tool)
            .arg("pull")
            .arg(&image)
            .output()
            .await
            .map_err(|e| GrabError::Strategy(e.into()))?;
        if !pull.status.success() {
            return Err(GrabError::Strategy(anyhow::anyhow!(
                "{cli_tool} pull failed: {}",
                String::from_utf8_lossy(&pull.stderr)
            )));
        }

        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        tokio::fs::create_dir_all(&ctx.output_root)
            .await
            .map_err(GrabError::Io)?;
        let tar_path = ctx.output_root.join("image.tar");

        let save = tokio::process::Command::new(cli_tool)
            .arg("save")
            .arg("-o")
            .arg(&tar_path)
            .arg(&image)
            .output()
            .await
            .map_err(|e| GrabError::Strategy(e.into()))?;
        if !save.status.success() {
            return Err(GrabError::Strategy(anyhow::anyhow!(
                "{cli_tool} save failed: {}",
                String::from_utf8_lossy(&save.stderr)
            )));
        }

        (ctx.on_log)(&format!("extracting {}", tar_path.display()));

        let output_root = ctx.output_root.clone();
        let tar_path_for_blocking = tar_path.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let file = std::fs::File::open(&tar_path_for_blocking)?;
            let mut archive = tar::Archive::new(file);
            archive.unpack(&output_root)?;
            std::fs::remove_file(&tar_path_for_blocking)?;
            Ok(())
        })
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?
        .map_err(GrabError::Strategy)?;

        let mut tree = FileTree::new();
        collect_tree(&ctx.output_root, &ctx.output_root, &mut tree);
        info!("extracted {} files from container image", tree.len());
        Ok(tree)
    }
}

fn collect_tree(dir: &std::path::Path, output_root: &std::path::Path, tree: &mut FileTree) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tree(&path, output_root, tree);
        } else if let Ok(relative) = path.strip_prefix(output_root) {
            tree.insert(
                relative.to_string_lossy().to_string(),
                "container_extract".to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_hub_r_path_is_stripped() {
        assert_eq!(
            image_name_from_url("https://hub.docker.com/r/library/nginx"),
            "library/nginx:latest"
        );
    }

    #[test]
    fn plain_path_gets_latest_tag() {
        assert_eq!(
            image_name_from_url("https://ghcr.io/foo/bar"),
            "foo/bar:latest"
        );
    }

    #[test]
    fn existing_tag_is_preserved() {
        assert_eq!(
            image_name_from_url("https://ghcr.io/foo/bar:v1.2.3"),
            "foo/bar:v1.2.3"
        );
    }
}
