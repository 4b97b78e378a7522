//! SSH-hosting strategy, per spec §4.4.
//!
//! SCP-based directory pull over SSH. Grounded on
//! `lachen-nv-bare-metal-manager-core`'s `async-ssh2-tokio` dependency.
//! Requires a local private-key path fetched via `prompt("ssh_key", …)`
//! and cached per-host in the credential store.

use std::path::Path;

use async_ssh2_tokio::client::{AuthMethod, Client, ServerCheckMethod};
use async_trait::async_trait;
use tracing::info;
use url::Url;

use super::{Strategy, StrategyContext};
use crate::collector::types::FileTree;
use crate::credentials::CredentialRecord;
use crate::error::GrabError;

pub struct SshStrategy;

fn parse_ssh_url(url: &str) -> anyhow::Result<(String, String, u16, String)> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("ssh URL has no host"))?
        .to_string();
    let user = if parsed.username().is_empty() {
        "git".to_string()
    } else {
        parsed.username().to_string()
    };
    let port = parsed.port().unwrap_or(22);
    let remote_path = parsed.path().to_string();
    Ok((user, host, port, remote_path))
}

#[async_trait]
impl Strategy for SshStrategy {
    async fn download(&self, ctx: &StrategyContext) -> Result<FileTree, GrabError> {
        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        let (config_user, config_host, config_port, config_remote_path) = (
            ctx.config.ssh_strategy.user.clone(),
            ctx.config.ssh_strategy.host.clone(),
            ctx.config.ssh_strategy.port,
            ctx.config.ssh_strategy.remote_path.clone(),
        );

        let (url_user, url_host, url_port, url_path) =
            parse_ssh_url(&ctx.url).map_err(GrabError::Strategy)?;

        let user = config_user.unwrap_or(url_user);
        let host = config_host.unwrap_or(url_host);
        let port = config_port.unwrap_or(url_port);
        let remote_path = config_remote_path.unwrap_or(url_path);

        let key_path = match ctx.credentials.get(&format!("ssh_{host}")).await {
            Some(record) => record.secret,
            None => {
                let provided = (ctx.prompt)("ssh_key", "Path to the SSH private key for this host");
                ctx.credentials
                    .put(CredentialRecord {
                        platform_id: format!("ssh_{host}"),
                        secret: provided.clone(),
                        metadata: Default::default(),
                        created_at: chrono::Utc::now(),
                    })
                    .await
                    .map_err(GrabError::Strategy)?;
                provided
            }
        };

        (ctx.on_log)(&format!("connecting to {user}@{host}:{port}"));

        let auth = AuthMethod::with_key_file(key_path, None);
        let client = Client::connect((host.as_str(), port), &user, auth, ServerCheckMethod::NoCheck)
            .await
            .map_err(|e| GrabError::Strategy(anyhow::anyhow!("ssh connect failed: {e}")))?;

        if ctx.cancel.is_cancelled() {
            return Err(GrabError::Cancelled);
        }

        let exclude_args: String = ctx
            .config
            .ssh_strategy
            .exclude
            .iter()
            .map(|pattern| format!("--exclude='{pattern}' "))
            .collect();

        let dest = ctx.output_root.join(
            Path::new(&remote_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "ssh_download".to_string()),
        );
        tokio::fs::create_dir_all(&dest)
            .await
            .map_err(GrabError::Io)?;

        info!("pulling {remote_path} from {host} via tar-over-ssh");
        let remote_command = format!("tar {exclude_args}-cf - -C '{remote_path}' .");
        let result = client
            .execute(&remote_command)
            .await
            .map_err(|e| GrabError::Strategy(anyhow::anyhow!("remote tar failed: {e}")))?;

        if result.exit_status != 0 {
            return Err(GrabError::Strategy(anyhow::anyhow!(
                "remote tar exited with status {}: {}",
                result.exit_status,
                result.stderr
            )));
        }

        let dest_for_blocking = dest.clone();
        let tar_bytes = result.stdout.into_bytes();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut archive = tar::Archive::new(std::io::Cursor::new(tar_bytes));
            archive.unpack(&dest_for_blocking)?;
            Ok(())
        })
        .await
        .map_err(|e| GrabError::Strategy(e.into()))?
        .map_err(GrabError::Strategy)?;

        let mut tree = FileTree::new();
        collect_tree(&dest, &ctx.output_root, &mut tree);
        Ok(tree)
    }
}

fn collect_tree(dir: &Path, output_root: &Path, tree: &mut FileTree) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tree(&path, output_root, tree);
        } else if let Ok(relative) = path.strip_prefix(output_root) {
            tree.insert(relative.to_string_lossy().to_string(), "ssh_pull".to_string());
        }
    }
}
