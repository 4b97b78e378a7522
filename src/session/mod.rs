//! Session provider (C4).
//!
//! Produces cookies for a target origin via browser import or interactive
//! login, per spec §4.2. The browser launched by `interactive_login`
//! outlives the call — the returned `BrowserSession` handle is owned and
//! torn down by the orchestrator, per the REDESIGN FLAG in spec §9.

pub mod browser_cookies;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser_setup::launch_browser;
use crate::credentials::CredentialStore;
use browser_cookies::BrowserId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Session {
    pub cookies: Vec<Cookie>,
}

/// A live browser opened for interactive login, owned by whoever receives
/// it from `interactive_login` (the orchestrator). Dropping without
/// calling `close` leaks the child process; `close` is the documented
/// teardown path.
pub struct BrowserSession {
    browser: chromiumoxide::Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl BrowserSession {
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("error closing interactive-login browser: {e}");
        }
        self.handler_task.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            warn!(
                "failed to remove browser profile dir {}: {e}",
                self.user_data_dir.display()
            );
        }
    }
}

pub struct SessionProvider {
    store: std::sync::Arc<CredentialStore>,
}

impl SessionProvider {
    #[must_use]
    pub fn new(store: std::sync::Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// Returns the cached session for `host`, if one has been imported or
    /// captured via interactive login in a prior call.
    pub async fn for_domain(&self, host: &str) -> Option<Session> {
        self.store.get_session(host).await
    }

    /// Enumerate cookies from a locally-installed browser's cookie store,
    /// keep only cookies matching `target_host`, and persist as the
    /// domain's session. Fails soft: returns whether any cookie was found.
    pub async fn import_from_browser(&self, browser_id: &str, target_host: &str) -> Result<bool> {
        let browser: BrowserId = browser_id.parse()?;
        let cookies = browser_cookies::read_cookies(browser, target_host)
            .with_context(|| format!("reading {browser_id} cookie store"))?;

        if cookies.is_empty() {
            info!("no cookies found for {target_host} in {browser_id}");
            return Ok(false);
        }

        let session = Session { cookies };
        self.store.put_session(target_host, &session).await?;
        info!(
            "imported {} cookies for {target_host} from {browser_id}",
            session.cookies.len()
        );
        Ok(true)
    }

    /// Launch a visible browser pointed at `url`, show a native modal asking
    /// the user to log in, then capture the browser context's cookies once
    /// they dismiss it. Returns the session plus the live browser handle,
    /// which the caller (orchestrator) must eventually `close()`.
    pub async fn interactive_login(
        &self,
        url: &str,
        target_host: &str,
    ) -> Result<(Session, BrowserSession)> {
        let (browser, handler_task, user_data_dir) = launch_browser(false, None)
            .await
            .context("launching browser for interactive login")?;

        let page = browser
            .new_page(url)
            .await
            .context("opening login page")?;
        page.wait_for_navigation().await.ok();

        // Blocking native dialog — runs on a blocking thread so it doesn't
        // stall the async runtime while the user completes the login flow.
        tokio::task::spawn_blocking(|| {
            rfd::MessageDialog::new()
                .set_title("webgrab")
                .set_description("Log in to the site in the opened browser window, then click OK to continue.")
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
        })
        .await
        .context("showing interactive login dialog")?;

        let cookies = page
            .get_cookies()
            .await
            .context("reading cookies from CDP Network.getCookies")?;

        let session = Session {
            cookies: cookies
                .into_iter()
                .map(|c| Cookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                    path: c.path,
                    expires: Some(c.expires as i64),
                    http_only: c.http_only,
                    secure: c.secure,
                })
                .collect(),
        };

        self.store.put_session(target_host, &session).await?;

        Ok((
            session,
            BrowserSession {
                browser,
                handler_task,
                user_data_dir,
            },
        ))
    }
}
