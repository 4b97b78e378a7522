//! Audit trail (C1) — append-only event log with wall-clock timestamps.
//!
//! Grounded on the original source's `core/audit_logger.py` (a
//! `logging.basicConfig`-backed `log_audit(message)` free function writing
//! to `audit.log`) and, for the on-disk append pattern, the teacher's own
//! atomic-write style in `collector::fetch::materialize`. Re-expressed here
//! as a small `tracing` subscriber layer plus a plain-file appender, since
//! the teacher's ambient stack is `tracing` rather than Python's `logging`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only audit log rooted at `<output_root>/audit.log`. Every line is
/// `<rfc3339 timestamp> - <message>`, mirroring the original's
/// `'%(asctime)s - %(message)s'` format string.
pub struct AuditTrail {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditTrail {
    /// Opens (creating if absent) the audit log under `output_root`.
    pub async fn open(output_root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(output_root)
            .await
            .context("creating output root for audit log")?;
        let path = output_root.join("audit.log");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Appends one audit line. Never fails the caller's run: a write error
    /// here is logged via `tracing` and swallowed, matching the
    /// soft-failure posture the rest of this crate gives non-core I/O.
    pub async fn record(&self, message: &str) {
        let _guard = self.lock.lock().await;
        let line = format!("{} - {message}\n", chrono::Utc::now().to_rfc3339());

        let result = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("failed to append to audit log {}: {e}", self.path.display());
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_are_appended_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let trail = AuditTrail::open(dir.path()).await.unwrap();
        trail.record("first event").await;
        trail.record("second event").await;

        let contents = tokio::fs::read_to_string(dir.path().join("audit.log"))
            .await
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first event"));
        assert!(lines[1].contains("second event"));
        assert!(lines[0].contains(" - "));
    }

    #[tokio::test]
    async fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        {
            let trail = AuditTrail::open(dir.path()).await.unwrap();
            trail.record("event a").await;
        }
        let trail = AuditTrail::open(dir.path()).await.unwrap();
        trail.record("event b").await;

        let contents = tokio::fs::read_to_string(dir.path().join("audit.log"))
            .await
            .unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
