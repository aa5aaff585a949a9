//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness check
//! GET    /health/ready           - Readiness check (storage reachable)
//!
//! # Customer accounts
//! POST   /user/register          - Register (rate limited)
//! POST   /user/login             - Login, returns bearer token (rate limited)
//! PATCH  /user/pass              - Change password (Bearer)
//! DELETE /user                   - Delete own account (Bearer)
//!
//! # Cart (Bearer)
//! GET    /user/cart              - Resolved items and unavailable count
//! POST   /user/cart              - Append a product
//! DELETE /user/cart              - Remove first occurrence of a product
//! POST   /user/cart/prune        - Drop references to deleted products
//!
//! # Catalog
//! GET    /products               - List products
//! GET    /products/{id}          - Product detail
//! POST   /products               - Create (Basic operator or Bearer retailer)
//! PATCH  /products/{id}          - Partial update (same)
//! DELETE /products/{id}          - Delete (same)
//!
//! # Retailers
//! POST   /retailer/register      - Register retailer and store (rate limited)
//! POST   /retailer/login         - Retailer-only login (rate limited)
//! GET    /retailer/my-products   - Products owned by the caller (Bearer retailer)
//! GET    /retailer/profile       - The caller's store profile (Bearer retailer)
//!
//! # Account administration (Basic operator)
//! PATCH  /admin/users/{id}       - Update name, email, or password
//! DELETE /admin/users/{id}       - Delete an account
//! ```

pub mod admin;
pub mod products;
pub mod retailers;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Register and login endpoints, optionally behind the rate limiter.
pub fn credential_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/user/register", post(users::register))
        .route("/user/login", post(users::login))
        .route("/retailer/register", post(retailers::register))
        .route("/retailer/login", post(retailers::login));

    if rate_limit {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the account and cart routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::delete(users::delete_account))
        .route("/pass", patch(users::change_password))
        .route(
            "/cart",
            get(users::view_cart)
                .post(users::add_to_cart)
                .delete(users::remove_from_cart),
        )
        .route("/cart/prune", post(users::prune_cart))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
}

/// Create the operator account administration router.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/users/{id}",
        patch(admin::update_account).delete(admin::delete_account),
    )
}

/// Create all routes for the API.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(credential_routes(rate_limit))
        .nest("/user", user_routes())
        .nest("/products", product_routes())
        .nest("/admin", admin_routes())
        .route("/retailer/my-products", get(retailers::my_products))
        .route("/retailer/profile", get(retailers::profile))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repos().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
