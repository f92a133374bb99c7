//! API integration tests for uptime-api routes.
//!
//! Uses Axum's `tower::ServiceExt` to send requests directly to the app
//! without binding a TCP socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use uptime_api::app::build_app;
use uptime_api::state::AppState;
use uptime_core::{HttpProber, MemoryStore, MonitorConfig, Scheduler};

fn app() -> axum::Router {
    let store = Arc::new(MemoryStore::new(100));
    let prober = Arc::new(HttpProber::new(Duration::from_secs(2)));
    let scheduler = Scheduler::new(MonitorConfig::default(), store, prober, None)
        .expect("default config is valid");
    build_app(AppState::new(Arc::new(scheduler)))
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(b) = body {
        builder
            .body(Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    }
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app();
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn metrics_returns_openmetrics() {
    let app = app();
    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.contains("openmetrics-text"));
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("uptime_monitor_state"));
    assert!(text.contains("# EOF"));
}

#[tokio::test]
async fn add_url_returns_201_and_normalizes() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "example.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["owner_id"], 7);
    assert_eq!(body["url"], "https://example.com");
}

#[tokio::test]
async fn add_url_twice_returns_conflict() {
    let app = app();
    let first = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "https://example.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "example.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second.into_body()).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn add_url_rejects_garbage() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "no t a url" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn list_urls_shows_pending_state() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "https://example.com" })),
        ))
        .await
        .unwrap();

    let resp = app
        .oneshot(json_request("GET", "/api/v1/owners/7/urls", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["urls"]["https://example.com"]["status"], "pending");
    assert!(body["urls"]["https://example.com"].get("last_check").is_none());
}

#[tokio::test]
async fn list_urls_is_scoped_per_owner() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/1/urls",
            Some(json!({ "url": "https://mine.example.com" })),
        ))
        .await
        .unwrap();

    let resp = app
        .oneshot(json_request("GET", "/api/v1/owners/2/urls", None))
        .await
        .unwrap();
    let body = body_json(resp.into_body()).await;
    assert!(body["urls"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn remove_url_then_404_on_second_attempt() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "https://example.com" })),
        ))
        .await
        .unwrap();

    let removed = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            "/api/v1/owners/7/urls?url=https%3A%2F%2Fexample.com",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::OK);

    let again = app
        .oneshot(json_request(
            "DELETE",
            "/api/v1/owners/7/urls?url=https%3A%2F%2Fexample.com",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_with_no_checks_are_zero_not_an_error() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "https://example.com" })),
        ))
        .await
        .unwrap();

    let resp = app
        .oneshot(json_request(
            "GET",
            "/api/v1/owners/7/urls/stats?url=https%3A%2F%2Fexample.com",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["uptime_percentage"], 0.0);
    assert_eq!(body["total_checks"], 0);
    assert_eq!(body["window_hours"], 24);
}

#[tokio::test]
async fn stats_reject_zero_window() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "GET",
            "/api/v1/owners/7/urls/stats?url=example.com&window_hours=0",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reports_not_running_and_counts() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/owners/7/urls",
            Some(json!({ "url": "https://example.com" })),
        ))
        .await
        .unwrap();

    let resp = app
        .oneshot(json_request("GET", "/api/v1/status", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["is_running"], false);
    assert_eq!(body["total_urls"], 1);
    assert_eq!(body["ping_interval_secs"], 60);
    assert_eq!(body["request_timeout_secs"], 30);
}

#[tokio::test]
async fn start_and_stop_monitoring_toggle_state() {
    let app = app();

    let started = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/monitoring/start", None))
        .await
        .unwrap();
    assert_eq!(started.status(), StatusCode::OK);

    let status = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/status", None))
        .await
        .unwrap();
    let body = body_json(status.into_body()).await;
    assert_eq!(body["is_running"], true);

    let stopped = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/monitoring/stop", None))
        .await
        .unwrap();
    assert_eq!(stopped.status(), StatusCode::OK);

    let status = app
        .oneshot(json_request("GET", "/api/v1/status", None))
        .await
        .unwrap();
    let body = body_json(status.into_body()).await;
    assert_eq!(body["is_running"], false);
}

#[tokio::test]
async fn ping_one_reports_stub_server_health() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/ping",
            Some(json!({ "url": server.uri() })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status_code"], 200);
}

#[tokio::test]
async fn ping_one_rejects_invalid_url() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/ping",
            Some(json!({ "url": "no t a url" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
