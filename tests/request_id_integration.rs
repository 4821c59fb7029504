use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use bgremove_backend::{
    AppState, build_router,
    config::{AppConfig, RemovalConfig},
};

fn build_app() -> Router {
    let config = AppConfig {
        removal: RemovalConfig {
            endpoint: "http://127.0.0.1:9/unused".to_string(),
            api_key: None,
            ..RemovalConfig::default()
        },
        ..AppConfig::default()
    };
    let state = AppState::new(config.removal.clone()).expect("build state");
    build_router(&config, state)
}

fn header_request_id(resp: &axum::response::Response) -> String {
    resp.headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let resp = build_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");

    assert_eq!(resp.status(), StatusCode::OK);
    let request_id = header_request_id(&resp);
    assert!(request_id.starts_with("req_"), "got {request_id}");
}

#[tokio::test]
async fn request_id_uses_client_value_when_valid() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "client.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /health");

    assert_eq!(header_request_id(&resp), "client.req-001");
}

#[tokio::test]
async fn request_id_replaces_unsafe_client_value() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "bad id/..")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /health");

    let request_id = header_request_id(&resp);
    assert_ne!(request_id, "bad id/..");
    assert!(request_id.starts_with("req_"));
}

#[tokio::test]
async fn error_body_contains_request_id() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/remove-bg")
                .header("x-request-id", "err.req-001")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .expect("request /api/remove-bg");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let request_id_header = header_request_id(&resp);

    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("parse json");
    assert_eq!(json["error"], "NO_IMAGE_DATA");
    assert_eq!(json["requestId"].as_str(), Some(request_id_header.as_str()));
}
