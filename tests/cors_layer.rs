use axum::{
    body::Body,
    http::{Request, header},
};
use tower::ServiceExt;

use bgremove_backend::{
    AppState, build_router,
    config::{AppConfig, CorsConfig, RemovalConfig},
};

fn build_app(cors: CorsConfig) -> axum::Router {
    let config = AppConfig {
        cors,
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

fn frontend_cors() -> CorsConfig {
    CorsConfig {
        enabled: true,
        allowed_origins: vec!["https://example.com".to_string()],
        allowed_headers: vec!["Content-Type".to_string()],
        ..CorsConfig::default()
    }
}

#[tokio::test]
async fn cors_preflight_allows_post_to_remove_bg() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/remove-bg")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("build request");
    let resp = build_app(frontend_cors()).oneshot(req).await.expect("call app");

    let allow_methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .expect("missing allow methods")
        .to_str()
        .expect("invalid allow methods");
    assert!(allow_methods.contains("POST"));

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("missing allow origin");
    assert_eq!(allow_origin, "https://example.com");
}

#[tokio::test]
async fn cors_headers_present_on_error_responses() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/remove-bg")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::from("{}"))
        .expect("build request");
    let resp = build_app(frontend_cors()).oneshot(req).await.expect("call app");

    assert_eq!(resp.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("missing allow origin"),
        "https://example.com"
    );
}

#[tokio::test]
async fn cors_disabled_adds_no_headers() {
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .expect("build request");
    let resp = build_app(CorsConfig::default()).oneshot(req).await.expect("call app");

    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
