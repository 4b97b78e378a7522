//! Git-hosting strategy, per spec §4.4.
//!
//! Clones (depth 1 permitted) into `output_root/<repo-name>`, injecting a
//! token into the clone URL for private repositories. Grounded on
//! `BVEnterprisess-AutoAgents`'s `git2` dependency.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use git2::{build::RepoBuilder, Cred, FetchOptions, RemoteCallbacks};
use tracing::info;

use super::{Strategy, StrategyContext};
use crate::collector::types::FileTree;
use crate::error::GrabError;

pub struct GitStrategy;

fn repo_name(url: &str) -> String {
    url.trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or("repository")
        .to_string()
}

fn inject_token(url: &str, token: &str) -> anyhow::Result<String> {
    let mut parsed = url::Url::parse(url).context("parsing git URL")?;
    parsed
        .set_username(token)
        .map_err(|()| anyhow::anyhow!("failed to set token on git URL"))?;
    Ok(parsed.to_string())
}

fn clone_into(clone_url: &str, dest: &Path, branch: Option<&str>) -> anyhow::Result<()> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, _allowed| {
        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks).depth(1);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    builder
        .clone(clone_url, dest)
        .context("git clone failed")?;
    Ok(())
}

fn collect_tree(dest: &Path, output_root: &Path) -> FileTree {
    let mut tree = FileTree::new();
    for entry in walkdir_files(dest) {
        if entry.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }
        if let Ok(relative) = entry.strip_prefix(output_root) {
            tree.insert(relative.to_string_lossy().to_string(), "git_clone".to_string());
        }
    }
    tree
}

fn walkdir_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}

#[async_trait]
impl Strategy for GitStrategy {
    async fn download(&self, ctx: &StrategyContext) -> Result<FileTree, GrabError> {
        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        let dest = ctx.output_root.join(repo_name(&ctx.url));
        let branch = ctx.config.git_strategy.branch.clone();
        let url = ctx.url.clone();
        let token = ctx.credentials.get("git").await.map(|r| r.secret);

        let clone_url = match token {
            Some(token) => inject_token(&url, &token).map_err(GrabError::Strategy)?,
            None => url,
        };

        (ctx.on_log)(&format!("cloning {} into {}", ctx.url, dest.display()));

        let dest_for_blocking = dest.clone();
        tokio::task::spawn_blocking(move || {
            clone_into(&clone_url, &dest_for_blocking, branch.as_deref())
        })
        .await
        .context("git clone task panicked")
        .map_err(GrabError::Strategy)?
        .map_err(GrabError::Strategy)?;

        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        info!("clone complete: {}", dest.display());
        Ok(collect_tree(&dest, &ctx.output_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_name_strips_git_suffix() {
        assert_eq!(repo_name("https://github.com/foo/bar.git"), "bar");
        assert_eq!(repo_name("https://github.com/foo/bar"), "bar");
        assert_eq!(repo_name("https://github.com/foo/bar/"), "bar");
    }
}
