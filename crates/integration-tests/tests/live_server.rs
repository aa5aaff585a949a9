//! Smoke test against a running server.
//!
//! Requires the API listening at `STOREKEEP_BASE_URL`
//! (default `http://localhost:3000`), e.g. with `STOREKEEP_STORAGE=memory`.
//!
//! Run with: cargo test -p storekeep-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

fn base_url() -> String {
    std::env::var("STOREKEEP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore = "Requires a running storekeep-api server"]
async fn test_register_login_and_cart_roundtrip() {
    let client = Client::new();
    let base_url = base_url();
    let email = format!("smoke-{}@example.test", Uuid::new_v4());

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/user/register"))
        .json(&json!({ "name": "Smoke", "email": email, "password": "p1" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base_url}/user/login"))
        .json(&json!({ "email": email, "password": "p1" }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("token in login response");

    let resp = client
        .get(format!("{base_url}/user/cart"))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to fetch cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("Failed to parse cart");
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["unavailable"], 0);

    let resp = client
        .delete(format!("{base_url}/user"))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to delete account");
    assert_eq!(resp.status(), StatusCode::OK);
}
