//! Integration tests for Storekeep.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (in-memory store, no server needed)
//! cargo test -p storekeep-integration-tests
//!
//! # Live-server smoke test
//! STOREKEEP_STORAGE=memory cargo run -p storekeep-api &
//! cargo test -p storekeep-integration-tests -- --ignored
//! ```
//!
//! [`TestApp`] builds the same router the binary serves, backed by the
//! in-memory store, and drives it with `tower::ServiceExt::oneshot`.

use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use storekeep_api::config::{
    ApiConfig, PasswordHashConfig, SigningKey, StorageConfig, TokenConfig,
};
use storekeep_api::db::Repositories;
use storekeep_api::state::AppState;

/// Operator seeded into every [`TestApp`].
pub const OPERATOR_USERNAME: &str = "ops";
/// Password of [`OPERATOR_USERNAME`].
pub const OPERATOR_PASSWORD: &str = "correct horse battery staple";

/// Configuration for in-process tests: memory store, cheap Argon2, no rate
/// limiting.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        storage: StorageConfig::Memory,
        host: "127.0.0.1".parse().expect("valid IP literal"),
        port: 0,
        tokens: TokenConfig {
            signing_key: SigningKey {
                id: "test".to_string(),
                secret: SecretString::from("k3Vq8ZpL2mWx9RtY4nBc7HdJ6fGs1QaE"),
            },
            previous_keys: Vec::new(),
            ttl: Duration::from_secs(3600),
        },
        password_hashing: PasswordHashConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        operator: None,
        rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, or `Value::Null` if the body was not JSON.
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    /// The `error` message of an error response.
    #[must_use]
    pub fn error(&self) -> &str {
        assert_eq!(self.body["status"], "error", "not an error body: {}", self.text);
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// In-process application under test.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// Build an app with an empty in-memory store and one operator.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built.
    pub async fn spawn() -> Self {
        let state = AppState::new(test_config(), Repositories::in_memory())
            .expect("Failed to build test state");
        state
            .auth()
            .ensure_operator(OPERATOR_USERNAME, OPERATOR_PASSWORD)
            .await
            .expect("Failed to seed operator");

        let router = storekeep_api::app(state.clone());
        Self { state, router }
    }

    /// Send one request.
    ///
    /// `auth` is the full `Authorization` header value.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    /// GET without credentials.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    /// Register a customer and return its id.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/user/register",
                None,
                Some(json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["id"]
            .as_str()
            .expect("id in register response")
            .to_owned()
    }

    /// Log in and return a ready-to-use `Authorization` header value.
    ///
    /// # Panics
    ///
    /// Panics if login fails.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/user/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        bearer(response.body["token"].as_str().expect("token in login response"))
    }

    /// Register and log in a customer.
    pub async fn customer(&self, email: &str) -> String {
        self.register("Customer", email, "p1").await;
        self.login(email, "p1").await
    }

    /// Register and log in a retailer; returns (account id, auth header).
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    pub async fn retailer(&self, email: &str, store_name: &str) -> (String, String) {
        let response = self
            .request(
                Method::POST,
                "/retailer/register",
                None,
                Some(json!({
                    "name": "Retailer",
                    "email": email,
                    "password": "r1",
                    "storeName": store_name,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        let id = response.body["accountId"]
            .as_str()
            .expect("accountId in response")
            .to_owned();

        let response = self
            .request(
                Method::POST,
                "/retailer/login",
                None,
                Some(json!({ "email": email, "password": "r1" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        let token = response.body["token"].as_str().expect("token in response");
        (id, bearer(token))
    }

    /// Create a product as the operator and return its id.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn create_product(&self, name: &str, price: f64) -> String {
        let response = self
            .request(
                Method::POST,
                "/products",
                Some(&operator_auth()),
                Some(json!({ "name": name, "price": price })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["id"]
            .as_str()
            .expect("id in product response")
            .to_owned()
    }
}

/// `Bearer <token>` header value.
#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// `Basic` header value for arbitrary credentials.
#[must_use]
pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// `Basic` header value for the seeded operator.
#[must_use]
pub fn operator_auth() -> String {
    basic(OPERATOR_USERNAME, OPERATOR_PASSWORD)
}
