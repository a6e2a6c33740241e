#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use invitations::api::types::FeatureFlags;
use invitations::app::{AppState, build_router};
use invitations::config::{DEFAULT_CHANGE_RETENTION_MAX_ROWS, DEFAULT_CHANGES_LIMIT, SiteConfig};
use invitations::directory::GuestDirectory;
use invitations::store::memory::InMemoryStore;
use invitations::store::{GuestStore, StoreConfig};
use std::sync::Arc;

pub const PUBLIC_URL: &str = "https://wedding.example";

pub type App = axum::routing::RouterIntoService<Body, ()>;

pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(StoreConfig {
        changes_limit: DEFAULT_CHANGES_LIMIT,
        change_retention_max_rows: Some(DEFAULT_CHANGE_RETENTION_MAX_ROWS),
    }))
}

pub fn state_with_store(store: Arc<dyn GuestStore>) -> AppState {
    AppState {
        features: FeatureFlags {
            durable_storage: store.is_durable(),
            live_updates: true,
        },
        directory: GuestDirectory::new(store),
        public_url: PUBLIC_URL.to_string(),
        site: SiteConfig {
            couple_names: "Rasmi & Alex".to_string(),
            wedding_date: Some("12 December 2026".to_string()),
        },
        api_version: "v1".to_string(),
    }
}

pub fn app_with_store(store: Arc<dyn GuestStore>) -> App {
    build_router(state_with_store(store)).into_service()
}

pub fn app() -> App {
    app_with_store(memory_store())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}
