//! End-to-end retry pipeline: a manifest listing failed URLs, recovered by
//! `retry_failed` through the three-stage ladder (§4.6), reusing the same
//! `derive_save_path` rule the collector uses so a successful retry lands
//! where a first-pass collector run would have put it (§8's "round-trip"
//! invariant, applied across C8/C10 rather than within C5 alone).

use std::collections::HashMap;

use webgrab::collector::types::{Resource, ResourceKind};
use webgrab::manifest::Manifest;
use webgrab::platform::{PlatformFamily, PlatformInfo};
use webgrab::retry_failed;

fn unknown_platform() -> PlatformInfo {
    PlatformInfo {
        id: "unknown".to_string(),
        family: PlatformFamily::Unknown,
        name: "unknown".to_string(),
        external_tool: None,
    }
}

#[tokio::test]
async fn retries_manifest_failed_urls_and_updates_disk() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/recovered.png"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"IMG".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let failed_url = format!("{}/recovered.png", server.uri());

    let mut resources = HashMap::new();
    resources.insert(
        failed_url.clone(),
        Resource {
            url: failed_url.clone(),
            kind: ResourceKind::Unknown,
            bytes: None,
            http_status: 500,
            save_path: None,
        },
    );
    let manifest = Manifest::build(&failed_url, unknown_platform(), &resources);
    assert_eq!(manifest.failed_urls, vec![failed_url.clone()]);
    manifest.write(dir.path()).await.unwrap();

    let recovered = retry_failed(dir.path()).await.unwrap();
    assert_eq!(recovered, 1);

    let saved = webgrab::collector::save_path::derive_save_path(
        dir.path(),
        &failed_url,
        ResourceKind::Image,
    );
    assert!(saved.exists());
}

#[tokio::test]
async fn empty_failed_list_recovers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = Manifest::build("https://e.com/", unknown_platform(), &HashMap::new());
    manifest.write(dir.path()).await.unwrap();

    let recovered = retry_failed(dir.path()).await.unwrap();
    assert_eq!(recovered, 0);
}
