//! Health checks and the shared middleware stack.

use axum::http::{Method, StatusCode};

use storekeep_integration_tests::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.text, "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = TestApp::spawn().await;

    for response in [app.get("/health").await, app.get("/products/missing").await] {
        assert_eq!(response.headers["x-content-type-options"], "nosniff");
        assert_eq!(response.headers["x-frame-options"], "DENY");
        assert_eq!(response.headers["cache-control"], "no-store");
    }
}

#[tokio::test]
async fn test_request_id_is_generated_or_echoed() {
    let app = TestApp::spawn().await;

    let generated = app.get("/health").await;
    let id = generated.headers["x-request-id"].to_str().unwrap_or_default();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "edge-1234")
        .body(axum::body::Body::empty())
        .expect("valid request");
    let echoed = app.send(request).await;
    assert_eq!(echoed.headers["x-request-id"], "edge-1234");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app.get("/nope").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.request(Method::PUT, "/products", None, None).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}
