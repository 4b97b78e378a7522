//! Strategy-dispatch scenarios for the orchestrator, per spec §8 scenario 5
//! ("Git platform dispatch"): classification must route to the matching
//! strategy without ever touching the network or a browser. Every
//! strategy checks its cancellation token before doing any I/O (see each
//! `strategies::*::download`), so pre-cancelling lets these run fully
//! offline while still exercising the classify -> select -> execute path.

use tempfile::tempdir;
use webgrab::cancel::CancelToken;
use webgrab::orchestrator::{self, default_options};

async fn run_cancelled(url: &str) -> webgrab::FileTree {
    let dir = tempdir().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let options = default_options(dir.path(), cancel);
    orchestrator::run(url, options).await.unwrap()
}

#[tokio::test]
async fn git_hosting_url_dispatches_without_network_access() {
    let tree = run_cancelled("https://github.com/foo/bar").await;
    assert!(tree.is_empty());
}

#[tokio::test]
async fn container_registry_url_dispatches_without_network_access() {
    let tree = run_cancelled("https://ghcr.io/foo/bar").await;
    assert!(tree.is_empty());
}

#[tokio::test]
async fn ssh_scheme_dispatches_without_network_access() {
    let tree = run_cancelled("ssh://git@example.com/repo.git").await;
    assert!(tree.is_empty());
}

#[tokio::test]
async fn paas_url_dispatches_without_network_access() {
    let tree = run_cancelled("https://my-app.herokuapp.com").await;
    assert!(tree.is_empty());
}

#[tokio::test]
async fn output_root_is_created_even_on_immediate_cancellation() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested").join("out");
    let cancel = CancelToken::new();
    cancel.cancel();
    let options = default_options(&nested, cancel);
    orchestrator::run("https://github.com/foo/bar", options).await.unwrap();
    assert!(nested.is_dir());
}
