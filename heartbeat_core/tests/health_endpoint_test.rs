use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use heartbeat_core::{
    config::{AppConfig, LivenessKind},
    create_app, get_database_pool,
    health::StaticLivenessCheck,
    AppState, HeartbeatStatus, HeartbeatStore, InMemorySpanRecorder, SqliteHeartbeatStore,
};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

fn test_config(db_file: &NamedTempFile) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite:{}", db_file.path().display());
    config.simulation.error_rate = 0.0;
    config.simulation.min_delay_ms = 0;
    config.simulation.max_delay_ms = 1;
    config
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_previous_check() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let recorder = InMemorySpanRecorder::new();
    let state = AppState::bootstrap(&config, Arc::new(recorder.clone())).await.unwrap();
    let app = create_app(state, &config);

    let (status, first) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "healthy");
    assert!(first.get("last_check").is_none());
    assert!(first["response_time_ms"].is_u64());

    let (status, second) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["last_check"]["status"], "healthy");
    assert_eq!(second["last_check"]["timestamp"], first["timestamp"]);
    assert_eq!(second["last_check"]["response_time_ms"], first["response_time_ms"]);

    let operations = recorder.operations();
    assert_eq!(operations.first(), Some(&"heartbeat.initialize"));
    assert_eq!(operations.iter().filter(|op| **op == "health.evaluate").count(), 2);
}

#[tokio::test]
async fn test_health_failure_returns_generic_500() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let recorder = Arc::new(InMemorySpanRecorder::new());

    let pool = get_database_pool(&config.database).await.unwrap();
    let store = SqliteHeartbeatStore::new(pool.clone(), recorder.clone());
    store.initialize().await.unwrap();
    let store: Arc<dyn HeartbeatStore> = Arc::new(store);

    let state = AppState::new(&config, recorder.clone(), store.clone(), Arc::new(StaticLivenessCheck::healthy()));
    let app = create_app(state, &config);

    pool.close().await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Health check failed");
    assert!(!body.to_string().contains("pool"));

    let evaluate = &recorder.spans_named("health.evaluate")[0];
    assert!(evaluate.status.is_error());
}

#[tokio::test]
async fn test_unhealthy_liveness_is_recorded_and_reported_as_500() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let recorder = Arc::new(InMemorySpanRecorder::new());

    let pool = get_database_pool(&config.database).await.unwrap();
    let store = SqliteHeartbeatStore::new(pool, recorder.clone());
    store.initialize().await.unwrap();
    let store: Arc<dyn HeartbeatStore> = Arc::new(store);

    let state = AppState::new(&config, recorder, store.clone(), Arc::new(StaticLivenessCheck::unhealthy()));
    let app = create_app(state, &config);

    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let latest = store.latest().await.unwrap().unwrap();
    assert_eq!(latest.status, HeartbeatStatus::Unhealthy);
}

#[tokio::test]
async fn test_upstream_liveness_check_backs_health() {
    let db_file = NamedTempFile::new().unwrap();
    let mut config = test_config(&db_file);
    config.heartbeat.liveness_check = LivenessKind::Upstreams;
    let recorder = InMemorySpanRecorder::new();

    let state = AppState::bootstrap(&config, Arc::new(recorder.clone())).await.unwrap();
    let app = create_app(state, &config);

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let operations = recorder.operations();
    for stage in ["catalog.query", "inventory.check", "pricing.calculate"] {
        assert!(operations.contains(&stage), "missing span for {}", stage);
    }
    let evaluate = &recorder.spans_named("health.evaluate")[0];
    assert_eq!(evaluate.attribute("health.check"), Some("upstreams"));
}

#[tokio::test]
async fn test_concurrent_health_checks_record_every_heartbeat() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let state = AppState::bootstrap(&config, Arc::new(InMemorySpanRecorder::new())).await.unwrap();
    let store = state.store.clone();
    let app = create_app(state, &config);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
                app.oneshot(request).await.unwrap().status()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(store.count().await.unwrap(), 50);
}

#[tokio::test]
async fn test_root_greets() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let state = AppState::bootstrap(&config, Arc::new(InMemorySpanRecorder::new())).await.unwrap();
    let app = create_app(state, &config);

    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "Hello": "World" }));
}

#[tokio::test]
async fn test_item_lookup_endpoint() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let recorder = InMemorySpanRecorder::new();
    let state = AppState::bootstrap(&config, Arc::new(recorder.clone())).await.unwrap();
    let app = create_app(state, &config);

    let (status, body) = get_json(&app, "/items/17").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item_id"], 17);
    assert_eq!(body["name"], "Item 17");
    assert!(body["price"].is_number());

    let lookup = &recorder.spans_named("item.lookup")[0];
    assert_eq!(lookup.attribute("item.id"), Some("17"));
}

#[tokio::test]
async fn test_item_lookup_rejects_non_integer_id() {
    let db_file = NamedTempFile::new().unwrap();
    let config = test_config(&db_file);
    let state = AppState::bootstrap(&config, Arc::new(InMemorySpanRecorder::new())).await.unwrap();
    let app = create_app(state, &config);

    let (status, _) = get_json(&app, "/items/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_item_lookup_failure_returns_500() {
    let db_file = NamedTempFile::new().unwrap();
    let mut config = test_config(&db_file);
    config.simulation.error_rate = 1.0;
    let state = AppState::bootstrap(&config, Arc::new(InMemorySpanRecorder::new())).await.unwrap();
    let app = create_app(state, &config);

    let (status, body) = get_json(&app, "/items/3").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Random server error");
}
