//! HTTP boundary: shared state, background tasks and routing.

mod error;
mod handlers;

pub use error::ApiError;

use axum::{
    http::Method,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ServerConfig;
use crate::items::ItemRepository;
use crate::query::ParamPolicy;
use crate::stats::StatsAggregator;
use crate::storage::ItemStore;
use crate::watcher::DocumentWatcher;

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Shared application state
pub struct AppState {
    /// Read path over the backing document
    pub store: ItemStore,
    /// Write path
    pub repository: ItemRepository,
    /// Cached statistics
    pub stats: Arc<StatsAggregator>,
    /// Change notifications for the backing document
    pub watcher: Arc<DocumentWatcher>,
    /// Handling of malformed list parameters
    pub param_policy: ParamPolicy,
    /// Server start time
    pub started_at: Instant,
    /// Shutdown signal for background tasks
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Build the services; the watcher takes its baseline here, before any
    /// request can be served
    pub fn new(config: &ServerConfig) -> Self {
        let store = ItemStore::new(config.store_config());
        let repository =
            ItemRepository::new(store.clone()).with_validator(config.validation.validator());
        let stats = Arc::new(StatsAggregator::new(store.clone()));
        let watcher = Arc::new(DocumentWatcher::start(store.path()));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            store,
            repository,
            stats,
            watcher,
            param_policy: config.param_policy,
            started_at: Instant::now(),
            shutdown_tx,
        }
    }

    /// Get a shutdown receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Stop the document watch and background tasks
    pub fn shutdown(&self) {
        self.watcher.stop();
        let _ = self.shutdown_tx.send(());
    }

    /// Start the stats invalidation listener
    pub fn start_background_tasks(&self) -> BackgroundTaskHandles {
        let invalidation_task = self
            .stats
            .clone()
            .spawn_invalidation(self.watcher.as_ref(), self.shutdown_receiver());

        info!(
            "Stats cache follows changes to {}",
            self.watcher.path().display()
        );

        BackgroundTaskHandles { invalidation_task }
    }
}

/// Handles for background tasks
pub struct BackgroundTaskHandles {
    pub invalidation_task: tokio::task::JoinHandle<()>,
}

impl BackgroundTaskHandles {
    /// Wait for all tasks to complete
    pub async fn wait(self) {
        let _ = self.invalidation_task.await;
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route("/api/items/:id", get(handlers::get_item))
        .route("/api/stats", get(handlers::get_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ValidationPolicy;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    const TWO_ITEMS: &str = r#"[
        {"id": 1, "name": "Red Laptop", "price": 1000, "category": "Electronics"},
        {"id": 2, "name": "Mouse", "price": 20, "category": "Electronics"}
    ]"#;

    /// Upper bound for a filesystem event to reach the listener
    const SETTLE: Duration = Duration::from_millis(200);

    fn test_config(dir: &Path) -> ServerConfig {
        ServerConfig::default().with_data_path(dir.join("items.json"))
    }

    fn seeded_state() -> (TempDir, Arc<AppState>) {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("items.json"), TWO_ITEMS).unwrap();
        let state = Arc::new(AppState::new(&test_config(dir.path())));
        (dir, state)
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        send(state, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(state: &Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(state, request).await
    }

    #[tokio::test]
    async fn test_list_returns_bare_array() {
        let (_dir, state) = seeded_state();
        let (status, body) = get(&state, "/api/items").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_array());
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_filters_by_name() {
        let (_dir, state) = seeded_state();
        let (status, body) = get(&state, "/api/items?q=laptop").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": 1, "name": "Red Laptop", "price": 1000.0, "category": "Electronics"}]));
    }

    #[tokio::test]
    async fn test_pagination_envelope() {
        let (_dir, state) = seeded_state();

        let (_, first) = get(&state, "/api/items?page=1&pageSize=1").await;
        assert_eq!(first["data"][0]["id"], 1);
        assert_eq!(first["total"], 2);
        assert_eq!(first["page"], 1);
        assert_eq!(first["pageSize"], 1);
        assert_eq!(first["totalPages"], 2);

        let (_, second) = get(&state, "/api/items?page=2&pageSize=1").await;
        assert_eq!(second["data"][0]["id"], 2);

        let (status, third) = get(&state, "/api/items?page=3&pageSize=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(third["data"], json!([]));
        assert_eq!(third["totalPages"], 2);
    }

    #[tokio::test]
    async fn test_legacy_limit() {
        let (_dir, state) = seeded_state();
        let (_, body) = get(&state, "/api/items?limit=1").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_pagination_falls_back_to_array() {
        let (_dir, state) = seeded_state();
        let (status, body) = get(&state, "/api/items?page=abc&pageSize=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_malformed_pagination() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("items.json"), TWO_ITEMS).unwrap();
        let config = test_config(dir.path()).with_param_policy(ParamPolicy::Strict);
        let state = Arc::new(AppState::new(&config));

        let (status, body) = get(&state, "/api/items?page=1&pageSize=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("pageSize"));
    }

    #[tokio::test]
    async fn test_get_item_by_id() {
        let (_dir, state) = seeded_state();

        let (status, body) = get(&state, "/api/items/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Mouse");

        let (status, body) = get(&state, "/api/items/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));

        let (status, _) = get(&state, "/api/items/abc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_id_with_trailing_text_is_not_found_rather_than_prefix_matched() {
        let (_dir, state) = seeded_state();

        let (status, body) = get(&state, "/api/items/2abc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("2abc"));

        let (status, body) = get(&state, "/api/items?limit=1abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_document_is_a_server_error() {
        let dir = tempdir().unwrap();
        let state = Arc::new(AppState::new(&test_config(dir.path())));

        let (status, _) = get(&state, "/api/items").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = get(&state, "/api/items/1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = get(&state, "/api/stats").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_stats_are_stable_between_calls() {
        let (_dir, state) = seeded_state();

        let (status, first) = get(&state, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, json!({"total": 2, "averagePrice": 510.0}));

        let (_, second) = get(&state, "/api/stats").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_create_then_stats_reflect_new_item() {
        let (_dir, state) = seeded_state();
        let tasks = state.start_background_tasks();

        let (_, before) = get(&state, "/api/stats").await;
        assert_eq!(before["total"], 2);

        let (status, created) = post_json(&state, "/api/items", json!({"name": "X", "price": 5})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "X");
        let id = created["id"].as_i64().unwrap();
        assert!(id > 2);

        let (status, fetched) = get(&state, &format!("/api/items/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        tokio::time::sleep(SETTLE).await;
        let (status, after) = get(&state, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(after["total"], 3);
        assert_eq!(after["averagePrice"], 1025.0 / 3.0);

        state.shutdown();
        tasks.wait().await;
    }

    #[tokio::test]
    async fn test_create_ignores_client_supplied_id() {
        let (_dir, state) = seeded_state();
        let (status, created) =
            post_json(&state, "/api/items", json!({"id": 1, "name": "Dup", "price": 1})).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(created["id"], 1);
    }

    #[tokio::test]
    async fn test_create_keeps_extra_fields() {
        let (_dir, state) = seeded_state();
        let (_, created) = post_json(
            &state,
            "/api/items",
            json!({"name": "Lamp", "price": 30, "category": "Home", "color": "white"}),
        )
        .await;

        assert_eq!(created["category"], "Home");
        assert_eq!(created["color"], "white");
    }

    #[tokio::test]
    async fn test_create_with_basic_validation() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("items.json"), TWO_ITEMS).unwrap();
        let config = test_config(dir.path()).with_validation(ValidationPolicy::Basic);
        let state = Arc::new(AppState::new(&config));

        let (status, body) = post_json(&state, "/api/items", json!({"price": 5})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("name"));

        let (_, items) = get(&state, "/api/items").await;
        assert_eq!(items.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_undecodable_body() {
        let (_dir, state) = seeded_state();

        let request = Request::post("/api/items")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ nope"))
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let request = Request::post("/api/items")
            .body(Body::from(r#"{"name": "X"}"#))
            .unwrap();
        let (status, _) = send(&state, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_wrong_field_types_are_rejected_without_validation() {
        let (_dir, state) = seeded_state();

        let (status, body) =
            post_json(&state, "/api/items", json!({"name": "X", "price": "cheap"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, _) = post_json(&state, "/api/items", json!({"name": "", "price": -1})).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, items) = get(&state, "/api/items").await;
        assert_eq!(items.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_health_reports_cache_state() {
        let (_dir, state) = seeded_state();

        let (status, body) = get(&state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["stats_cache"], "empty");

        get(&state, "/api/stats").await;
        let (_, body) = get(&state, "/health").await;
        assert_eq!(body["stats_cache"], "populated");
    }
}
