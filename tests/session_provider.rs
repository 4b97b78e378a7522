//! `SessionProvider` shares a single `CredentialStore` instance (via
//! `Arc`) with whatever else holds one — the orchestrator keeps its own
//! `Arc<CredentialStore>` for strategies while handing a clone of the
//! same `Arc` to the provider, so a session written through one is
//! visible to the other without a second on-disk store being opened.

use std::sync::Arc;

use webgrab::credentials::CredentialStore;
use webgrab::{Session, SessionProvider};

#[tokio::test]
async fn session_written_via_shared_store_is_visible_through_provider() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CredentialStore::open(dir.path()).await.unwrap());

    let session = Session {
        cookies: vec![webgrab::session::Cookie {
            name: "auth".to_string(),
            value: "token123".to_string(),
            domain: "example.com".to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: true,
            secure: true,
        }],
    };
    store.put_session("example.com", &session).await.unwrap();

    let provider = SessionProvider::new(Arc::clone(&store));
    let fetched = provider.for_domain("example.com").await.unwrap();
    assert_eq!(fetched.cookies[0].value, "token123");
}

#[tokio::test]
async fn unknown_domain_returns_no_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CredentialStore::open(dir.path()).await.unwrap());
    let provider = SessionProvider::new(store);
    assert!(provider.for_domain("never-seen.example.com").await.is_none());
}
