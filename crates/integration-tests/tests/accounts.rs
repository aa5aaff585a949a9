//! Registration, login, password change, and account deletion.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use storekeep_integration_tests::{TestApp, bearer};

#[tokio::test]
async fn test_register_returns_created_with_id() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "name": "A", "email": "a@x.com", "password": "p1" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "success");
    assert!(
        response.body["id"]
            .as_str()
            .is_some_and(|id| uuid::Uuid::parse_str(id).is_ok())
    );
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;
    app.register("A", "a@x.com", "p1").await;

    let response = app
        .request(
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "name": "B", "email": "a@x.com", "password": "p2" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error().contains("already exists"));
}

#[tokio::test]
async fn test_duplicate_detection_ignores_email_case() {
    let app = TestApp::spawn().await;
    app.register("A", "a@x.com", "p1").await;

    let response = app
        .request(
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "name": "A", "email": "A@X.COM", "password": "p1" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::spawn().await;

    for body in [
        json!({ "email": "a@x.com", "password": "p1" }),
        json!({ "name": "A", "password": "p1" }),
        json!({ "name": "A", "email": "a@x.com" }),
        json!({ "name": "A", "email": "not-an-email", "password": "p1" }),
        json!({ "name": "A", "email": "a@x.com", "password": "p1", "role": "admin" }),
    ] {
        let response = app
            .request(Method::POST, "/user/register", None, Some(body.clone()))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.body["status"], "error");
    }
}

#[tokio::test]
async fn test_malformed_json_is_a_json_error() {
    let app = TestApp::spawn().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/user/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .expect("valid request");
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], "error");
}

#[tokio::test]
async fn test_login_token_authenticates() {
    let app = TestApp::spawn().await;
    app.register("A", "a@x.com", "p1").await;

    let auth = app.login("a@x.com", "p1").await;
    let response = app
        .request(Method::GET, "/user/cart", Some(&auth), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_issues_no_token() {
    let app = TestApp::spawn().await;
    app.register("A", "a@x.com", "p1").await;

    for (email, password) in [("a@x.com", "p2"), ("a@x.com", ""), ("nobody@x.com", "p1")] {
        let response = app
            .request(
                Method::POST,
                "/user/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.body.get("token").is_none());
    }
}

#[tokio::test]
async fn test_bearer_failures() {
    let app = TestApp::spawn().await;
    let auth = app.customer("a@x.com").await;
    let raw_token = auth.trim_start_matches("Bearer ").to_owned();

    let missing = app.request(Method::GET, "/user/cart", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let raw = app
        .request(Method::GET, "/user/cart", Some(&raw_token), None)
        .await;
    assert_eq!(raw.status, StatusCode::UNAUTHORIZED);

    let tampered = app
        .request(
            Method::GET,
            "/user/cart",
            Some(&bearer(&format!("{raw_token}x"))),
            None,
        )
        .await;
    assert_eq!(tampered.status, StatusCode::UNAUTHORIZED);
    assert_eq!(tampered.error(), "invalid token");
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::spawn().await;
    let auth = app.customer("a@x.com").await;

    let response = app
        .request(
            Method::PATCH,
            "/user/pass",
            Some(&auth),
            Some(json!({ "password": "new-pass" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let old = app
        .request(
            Method::POST,
            "/user/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "p1" })),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    app.login("a@x.com", "new-pass").await;

    let empty = app
        .request(
            Method::PATCH,
            "/user/pass",
            Some(&auth),
            Some(json!({ "password": "" })),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_account_token_is_forbidden() {
    let app = TestApp::spawn().await;
    let auth = app.customer("a@x.com").await;

    let response = app.request(Method::DELETE, "/user", Some(&auth), None).await;
    assert_eq!(response.status, StatusCode::OK);

    // The token still verifies but no longer resolves to an account.
    let response = app
        .request(Method::GET, "/user/cart", Some(&auth), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.request(Method::DELETE, "/user", Some(&auth), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // The email is free again.
    app.register("A", "a@x.com", "p1").await;
}

#[tokio::test]
async fn test_token_for_unknown_account_is_forbidden() {
    let app = TestApp::spawn().await;
    app.register("A", "a@x.com", "p1").await;
    let (account, _) = app
        .state
        .auth()
        .login("a@x.com", "p1")
        .await
        .unwrap();
    let token = app.state.tokens().issue(&account).unwrap();
    app.state.auth().delete_account(&account).await.unwrap();

    let response = app
        .request(Method::GET, "/user/cart", Some(&bearer(&token)), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error(), "account no longer exists");
}
