//! Router tests driven in-process through `tower::ServiceExt::oneshot`.
//!
//! Telemetry is replaced by a recording client and a failing client so every
//! branch of the diagnostic routes can be observed without a backend.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use appdiag::telemetry::{
    EventTelemetry, RequestTelemetry, SeverityLevel, TelemetryClient, TelemetryError,
    TraceTelemetry,
};
use appdiag::{create_router, AppConfig, AppState};

#[derive(Default)]
struct RecordingClient {
    events: Mutex<Vec<EventTelemetry>>,
    traces: Mutex<Vec<TraceTelemetry>>,
    requests: Mutex<Vec<RequestTelemetry>>,
    flushes: Mutex<usize>,
}

impl TelemetryClient for RecordingClient {
    fn track_event(&self, event: EventTelemetry) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    fn track_trace(&self, trace: TraceTelemetry) -> Result<(), TelemetryError> {
        self.traces.lock().unwrap().push(trace);
        Ok(())
    }

    fn track_request(&self, request: RequestTelemetry) -> Result<(), TelemetryError> {
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    fn flush(&self) -> Result<(), TelemetryError> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Client whose every call fails.
struct FailingClient;

impl TelemetryClient for FailingClient {
    fn track_event(&self, _event: EventTelemetry) -> Result<(), TelemetryError> {
        Err(TelemetryError::Client("ingestion rejected the item".to_string()))
    }

    fn track_trace(&self, _trace: TraceTelemetry) -> Result<(), TelemetryError> {
        Err(TelemetryError::QueueFull)
    }

    fn track_request(&self, _request: RequestTelemetry) -> Result<(), TelemetryError> {
        Err(TelemetryError::Closed)
    }

    fn flush(&self) -> Result<(), TelemetryError> {
        Err(TelemetryError::Closed)
    }
}

fn config(vars: &[(&str, &str)]) -> AppConfig {
    let vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AppConfig::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}

fn app(config: AppConfig, client: Option<Arc<dyn TelemetryClient>>) -> Router {
    create_router(AppState::new(config, client))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_health_returns_plain_ok() {
    let app = app(config(&[]), None);
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_index_masks_long_storage_connection() {
    let app = app(
        config(&[
            ("STORAGE_CONN", "abcdefghijklmnopqrstuvwxyz"),
            ("APP_ENV", "production"),
            ("APP_MESSAGE", "hello"),
        ]),
        None,
    );
    let (status, json) = get_json(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["env"], "production");
    assert_eq!(json["message"], "hello");
    assert_eq!(json["storageConnMasked"], "abcdefghijklmnopqrst...");
    let deployed_at = json["deployedAt"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(deployed_at).is_ok());
}

#[tokio::test]
async fn test_index_masks_unset_storage_connection() {
    let app = app(config(&[]), None);
    let (status, json) = get_json(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["env"], "staging");
    assert_eq!(json["storageConnMasked"], "(not set)...");
}

#[tokio::test]
async fn test_diag_without_client() {
    let app = app(config(&[]), None);

    for uri in ["/diag", "/diag/trace"] {
        let (status, json) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "no defaultClient");
    }
}

#[tokio::test]
async fn test_diag_sends_event_and_flushes() {
    let client = Arc::new(RecordingClient::default());
    let app = app(config(&[]), Some(client.clone()));

    let (status, json) = get_json(&app, "/diag").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "ok": true, "sent": "DiagPing" }));
    let events = client.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "DiagPing");
    assert_eq!(*client.flushes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_diag_trace_sends_trace_and_flushes() {
    let client = Arc::new(RecordingClient::default());
    let app = app(config(&[("APP_MESSAGE", "redeploy check")]), Some(client.clone()));

    let (status, json) = get_json(&app, "/diag/trace").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "ok": true, "sent": "manual-trace" }));
    let traces = client.traces.lock().unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].message, "redeploy check");
    assert_eq!(traces[0].severity, SeverityLevel::Information);
    assert_eq!(
        traces[0].properties.get("source").map(String::as_str),
        Some("diag-endpoint")
    );
    assert_eq!(*client.flushes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_diag_reports_client_errors() {
    let app = app(config(&[]), Some(Arc::new(FailingClient)));

    let (status, json) = get_json(&app, "/diag").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["ok"], false);
    assert_eq!(
        json["error"],
        "telemetry client error: ingestion rejected the item"
    );

    let (status, json) = get_json(&app, "/diag/trace").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["ok"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());

    // The server keeps answering after telemetry failures
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_requests_are_auto_collected() {
    let client = Arc::new(RecordingClient::default());
    let app = app(config(&[]), Some(client.clone()));

    get(&app, "/health").await;
    get(&app, "/missing").await;

    let requests = client.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].name, "GET /health");
    assert_eq!(requests[0].response_code, 200);
    assert!(requests[0].success);
    assert_eq!(requests[1].response_code, 404);
    assert!(!requests[1].success);
}

#[tokio::test]
async fn test_request_telemetry_records_absolute_url() {
    let client = Arc::new(RecordingClient::default());
    let app = app(config(&[]), Some(client.clone()));

    app.clone()
        .oneshot(
            Request::builder()
                .uri("/health?x=1")
                .header(header::HOST, "example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let requests = client.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://example.com/health?x=1");
    assert_eq!(requests[0].name, "GET /health");
}

#[tokio::test]
async fn test_request_collection_can_be_disabled() {
    let client = Arc::new(RecordingClient::default());
    let mut config = config(&[]);
    config.telemetry.auto_collect_requests = false;
    let app = app(config, Some(client.clone()));

    get(&app, "/health").await;

    assert!(client.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_routes_fall_through() {
    let app = app(config(&[]), None);

    let (status, _) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
