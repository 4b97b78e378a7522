//! PaaS strategy, per spec §4.4.
//!
//! Family switch on platform id: Vercel/Netlify list deployments and files
//! via REST APIs with bearer tokens; Heroku shells out to
//! `heroku git:clone`; Render resolves to a git remote and delegates to
//! `GitStrategy`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::git::GitStrategy;
use super::{Strategy, StrategyContext};
use crate::collector::types::FileTree;
use crate::error::GrabError;

pub struct PaasStrategy;

#[derive(Debug, Deserialize)]
struct VercelFile {
    file: String,
    data: Option<String>,
}

async fn download_vercel(ctx: &StrategyContext) -> Result<FileTree, GrabError> {
    let token = ctx
        .credentials
        .get("vercel")
        .await
        .map(|r| r.secret)
        .ok_or_else(|| GrabError::AuthRequired {
            platform: "vercel".to_string(),
        })?;

    let client = reqwest::Client::new();
    let deployment_id = ctx
        .url
        .split('/')
        .next_back()
        .unwrap_or_default()
        .to_string();

    let files: Vec<VercelFile> = client
        .get(format!(
            "https://api.vercel.com/v6/deployments/{deployment_id}/files"
        ))
        .bearer_auth(&token)
        .send()
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?
        .json()
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?;

    let mut tree = FileTree::new();
    for entry in files {
        let dest = ctx.output_root.join(&entry.file);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(GrabError::Io)?;
        }
        if let Some(data) = entry.data {
            tokio::fs::write(&dest, data).await.map_err(GrabError::Io)?;
            tree.insert(entry.file, "vercel_deployment".to_string());
        }
    }
    Ok(tree)
}

async fn download_netlify(ctx: &StrategyContext) -> Result<FileTree, GrabError> {
    let token = ctx
        .credentials
        .get("netlify")
        .await
        .map(|r| r.secret)
        .ok_or_else(|| GrabError::AuthRequired {
            platform: "netlify".to_string(),
        })?;

    let client = reqwest::Client::new();
    let site_id = ctx
        .url
        .split('/')
        .next_back()
        .unwrap_or_default()
        .to_string();

    #[derive(Deserialize)]
    struct NetlifyFile {
        path: String,
    }

    let files: Vec<NetlifyFile> = client
        .get(format!("https://api.netlify.com/api/v1/sites/{site_id}/files"))
        .bearer_auth(&token)
        .send()
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?
        .json()
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?;

    let mut tree = FileTree::new();
    for entry in files {
        tree.insert(entry.path, "netlify_deployment".to_string());
    }
    Ok(tree)
}

async fn download_heroku(ctx: &StrategyContext) -> Result<FileTree, GrabError> {
    which::which("heroku").map_err(|_| GrabError::MissingTool {
        tool: "heroku".to_string(),
        hint: "install the Heroku CLI: https://devcenter.heroku.com/articles/heroku-cli".to_string(),
    })?;

    let app_name = ctx
        .config
        .paas_strategy
        .heroku
        .app_name
        .clone()
        .ok_or_else(|| {
            GrabError::Strategy(anyhow::anyhow!(
                "paas_strategy.heroku.app_name is not set in config.json"
            ))
        })?;

    let api_key = ctx
        .credentials
        .get("heroku")
        .await
        .map(|r| r.secret)
        .unwrap_or_default();

    let dest = ctx.output_root.join(&app_name);

    info!("cloning heroku app {app_name} via heroku git:clone");
    let output = tokio::process::Command::new("heroku")
        .arg("git:clone")
        .arg("-a")
        .arg(&app_name)
        .arg(&dest)
        .env("HEROKU_API_KEY", api_key)
        .output()
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?;

    if !output.status.success() {
        return Err(GrabError::Strategy(anyhow::anyhow!(
            "heroku git:clone failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let mut tree = FileTree::new();
    collect_tree(&dest, &ctx.output_root, &mut tree);
    Ok(tree)
}

fn collect_tree(dir: &std::path::Path, output_root: &std::path::Path, tree: &mut FileTree) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }
        if path.is_dir() {
            collect_tree(&path, output_root, tree);
        } else if let Ok(relative) = path.strip_prefix(output_root) {
            tree.insert(relative.to_string_lossy().to_string(), "heroku_clone".to_string());
        }
    }
}

#[async_trait]
impl Strategy for PaasStrategy {
    async fn download(&self, ctx: &StrategyContext) -> Result<FileTree, GrabError> {
        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        match ctx.platform.id.as_str() {
            "vercel" => download_vercel(ctx).await,
            "netlify" => download_netlify(ctx).await,
            "heroku" => download_heroku(ctx).await,
            "render" => GitStrategy.download(ctx).await,
            other => Err(GrabError::Strategy(anyhow::anyhow!(
                "unsupported PaaS platform id: {other}"
            ))),
        }
    }
}
