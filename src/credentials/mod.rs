//! Encrypted credential store (C2).
//!
//! Secrets are kept at rest under an authenticated-symmetric-encryption
//! construction (`ChaCha20Poly1305`) with a key file at mode 0600, grounded
//! on `AharonR-downloader`'s dependency on the same crate family. No key
//! derivation from user input — the key is generated on first use, per
//! spec §9's design notes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::warn;

use crate::session::Session;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub platform_id: String,
    pub secret: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialBlob {
    #[serde(default)]
    platforms: HashMap<String, CredentialRecord>,
}

/// Domain- and platform-keyed encrypted secret storage.
///
/// Writes are serialized behind a single mutex per spec §5 ("the
/// credential store serializes writes"). Read/write failures fall back to
/// an in-memory empty store rather than raising, per spec §7.
pub struct CredentialStore {
    key_path: PathBuf,
    blob_path: PathBuf,
    session_dir: PathBuf,
    write_lock: Mutex<()>,
}

fn key_from_bytes(raw: &[u8; 32]) -> Key {
    *Key::from_slice(raw)
}

fn derive_nonce(seed: &[u8]) -> Nonce {
    let digest = Sha256::digest(seed);
    *Nonce::from_slice(&digest[..12])
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms).context("setting credential file permissions")?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl CredentialStore {
    /// Opens (or initializes) the credential store rooted at `base_dir`,
    /// typically the output root or a per-user config directory.
    pub async fn open(base_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(base_dir)
            .await
            .context("creating credential store directory")?;

        let key_path = base_dir.join("webgrab.key");
        let blob_path = base_dir.join("credentials.dat");
        let session_dir = base_dir.join("sessions");
        tokio::fs::create_dir_all(&session_dir)
            .await
            .context("creating session directory")?;

        if !key_path.exists() {
            let mut raw = [0u8; 32];
            OsRng.fill_bytes(&mut raw);
            tokio::fs::write(&key_path, raw)
                .await
                .context("writing credential key file")?;
            restrict_permissions(&key_path)?;
        }

        Ok(Self {
            key_path,
            blob_path,
            session_dir,
            write_lock: Mutex::new(()),
        })
    }

    async fn load_key(&self) -> Result<[u8; 32]> {
        let raw = tokio::fs::read(&self.key_path)
            .await
            .context("reading credential key file")?;
        raw.try_into()
            .map_err(|_| anyhow::anyhow!("credential key file is not 32 bytes"))
    }

    async fn cipher(&self) -> Result<ChaCha20Poly1305> {
        let key_bytes = self.load_key().await?;
        Ok(ChaCha20Poly1305::new(&key_from_bytes(&key_bytes)))
    }

    async fn encrypt_to(&self, path: &Path, plaintext: &[u8]) -> Result<()> {
        let cipher = self.cipher().await?;
        let nonce = derive_nonce(path.as_os_str().as_encoded_bytes());
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| anyhow::anyhow!("encryption failed: {e}"))?;
        tokio::fs::write(path, ciphertext)
            .await
            .with_context(|| format!("writing encrypted blob at {}", path.display()))?;
        restrict_permissions(path)?;
        Ok(())
    }

    async fn decrypt_from(&self, path: &Path) -> Result<Vec<u8>> {
        let cipher = self.cipher().await?;
        let nonce = derive_nonce(path.as_os_str().as_encoded_bytes());
        let ciphertext = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading encrypted blob at {}", path.display()))?;
        cipher
            .decrypt(&nonce, ciphertext.as_slice())
            .map_err(|e| anyhow::anyhow!("decryption failed: {e}"))
    }

    async fn load_blob(&self) -> CredentialBlob {
        if !self.blob_path.exists() {
            return CredentialBlob::default();
        }
        match self.decrypt_from(&self.blob_path).await {
            Ok(plaintext) => serde_json::from_slice(&plaintext).unwrap_or_default(),
            Err(e) => {
                warn!("credential blob unreadable, falling back to empty store: {e}");
                CredentialBlob::default()
            }
        }
    }

    /// Stores a secret for `platform_id`, encrypting the whole blob at rest.
    pub async fn put(&self, record: CredentialRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut blob = self.load_blob().await;
        blob.platforms.insert(record.platform_id.clone(), record);
        let plaintext = serde_json::to_vec(&blob).context("serializing credential blob")?;
        self.encrypt_to(&self.blob_path, &plaintext).await
    }

    /// Fetches a previously-stored secret, if any. Never raises on a
    /// corrupt/missing blob — logs and returns `None`.
    pub async fn get(&self, platform_id: &str) -> Option<CredentialRecord> {
        let blob = self.load_blob().await;
        blob.platforms.get(platform_id).cloned()
    }

    fn session_path(&self, host: &str) -> PathBuf {
        self.session_dir.join(format!("session_{host}.dat"))
    }

    /// Persists a per-domain cookie snapshot under `session_<host>`.
    pub async fn put_session(&self, host: &str, session: &Session) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.session_path(host);
        let plaintext = serde_json::to_vec(session).context("serializing session")?;
        self.encrypt_to(&path, &plaintext).await
    }

    /// Loads a previously-cached cookie snapshot for `host`, if any.
    pub async fn get_session(&self, host: &str) -> Option<Session> {
        let path = self.session_path(host);
        if !path.exists() {
            return None;
        }
        match self.decrypt_from(&path).await {
            Ok(plaintext) => serde_json::from_slice(&plaintext).ok(),
            Err(e) => {
                warn!("session blob for {host} unreadable: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_a_credential_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).await.unwrap();
        let record = CredentialRecord {
            platform_id: "github".to_string(),
            secret: "ghp_abc123".to_string(),
            metadata: HashMap::new(),
            created_at: chrono::Utc::now(),
        };
        store.put(record.clone()).await.unwrap();

        let fetched = store.get("github").await.unwrap();
        assert_eq!(fetched.secret, "ghp_abc123");
    }

    #[tokio::test]
    async fn missing_platform_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).await.unwrap();
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn roundtrips_a_session_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).await.unwrap();
        let session = Session {
            cookies: vec![crate::session::Cookie {
                name: "sid".to_string(),
                value: "xyz".to_string(),
                domain: "example.com".to_string(),
                path: "/".to_string(),
                expires: None,
                http_only: true,
                secure: true,
            }],
        };
        store.put_session("example.com", &session).await.unwrap();
        let fetched = store.get_session("example.com").await.unwrap();
        assert_eq!(fetched.cookies.len(), 1);
        assert_eq!(fetched.cookies[0].name, "sid");
    }
}
