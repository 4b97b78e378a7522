//! Rendering step, per spec §4.3.1.
//!
//! Launches a headless browser, attaches the supplied cookies, navigates to
//! the entry URL, and waits for network idle with a hard 60s timeout. Built
//! directly on the teacher's `browser_setup::launch_browser` and the
//! timeout-wrapped navigation pattern from `crawl_engine::core::crawl_pages`.

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::browser_setup::launch_browser;
use crate::session::Session;
use crate::utils::constants::NAVIGATION_TIMEOUT_SECS;

pub struct RenderedPage {
    pub html: String,
    pub browser: chromiumoxide::Browser,
    pub handler_task: JoinHandle<()>,
    pub user_data_dir: std::path::PathBuf,
}

fn to_cookie_param(session: &Session, url: &str) -> Vec<CookieParam> {
    session
        .cookies
        .iter()
        .map(|c| {
            CookieParam::builder()
                .name(c.name.clone())
                .value(c.value.clone())
                .domain(c.domain.clone())
                .path(c.path.clone())
                .http_only(c.http_only)
                .secure(c.secure)
                .url(url.to_string())
                .build()
                .unwrap_or_else(|_| {
                    CookieParam::builder()
                        .name(c.name.clone())
                        .value(c.value.clone())
                        .build()
                        .expect("name and value are always present")
                })
        })
        .collect()
}

/// Renders `url`, returning the final HTML. On navigation timeout,
/// proceeds with whatever content is available (does not fail the run);
/// on any other navigation error, returns `Ok(None)` so the caller seeds
/// an empty mapping per spec §4.3.1.
pub async fn render(url: &str, session: Option<&Session>) -> Result<Option<RenderedPage>> {
    let (browser, handler_task, user_data_dir) = launch_browser(true, None).await?;

    let page = match browser.new_page("about:blank").await {
        Ok(p) => p,
        Err(e) => {
            warn!("failed to open page for {url}: {e}");
            return Ok(None);
        }
    };

    if let Some(session) = session {
        let cookies = to_cookie_param(session, url);
        if !cookies.is_empty() {
            if let Err(e) = page.set_cookies(cookies).await {
                warn!("failed to attach session cookies for {url}: {e}");
            }
        }
    }

    if let Err(e) = page.goto(url).await {
        warn!("navigation failed for {url}: {e}");
        return Ok(None);
    }

    match tokio::time::timeout(
        Duration::from_secs(NAVIGATION_TIMEOUT_SECS),
        page.wait_for_navigation(),
    )
    .await
    {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("wait_for_navigation error for {url}, proceeding anyway: {e}"),
        Err(_) => warn!("wait_for_navigation timed out after {NAVIGATION_TIMEOUT_SECS}s for {url}, proceeding with available content"),
    }

    let html = match page.content().await {
        Ok(html) => html,
        Err(e) => {
            warn!("failed to read rendered content for {url}: {e}");
            return Ok(None);
        }
    };

    Ok(Some(RenderedPage {
        html,
        browser,
        handler_task,
        user_data_dir,
    }))
}

/// Unconditional teardown for a rendered-page browser, mirroring the
/// orchestrator's `finally: C4.close_browser()` contract (§4.5) but scoped
/// to the collector's own short-lived render browser.
pub async fn close(mut rendered: RenderedPage) {
    if let Err(e) = rendered.browser.close().await {
        warn!("error closing render browser: {e}");
    }
    rendered.handler_task.abort();
    if let Err(e) = std::fs::remove_dir_all(&rendered.user_data_dir) {
        warn!(
            "failed to remove render profile dir {}: {e}",
            rendered.user_data_dir.display()
        );
    }
}
