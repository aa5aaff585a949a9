//! Customer account and cart route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use storekeep_core::{AccountId, ProductId, Role};

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::Authenticated;
use crate::services::{CartView, Registration};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration request body. `role` defaults to customer.
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Password change request body.
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Cart add/remove request body. `product` is a product id.
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    #[serde(default)]
    pub product: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// Response for a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    pub status: &'static str,
    pub id: AccountId,
}

/// Response carrying a bearer token.
#[derive(Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    pub token: String,
}

/// Raw cart contents after a change.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub status: &'static str,
    pub cart: Vec<ProductId>,
}

// =============================================================================
// Accounts
// =============================================================================

/// POST /user/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>)> {
    let account = state
        .auth()
        .register(Registration {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            role: body.role.unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            status: "success",
            id: account.id,
        }),
    ))
}

/// POST /user/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let (_, token) = state.auth().login(&body.email, &body.password).await?;

    Ok(Json(TokenResponse {
        status: "success",
        token,
    }))
}

/// PATCH /user/pass
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn change_password(
    State(state): State<AppState>,
    Authenticated(account): Authenticated,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    state.auth().change_password(&account, &body.password).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// DELETE /user
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    Authenticated(account): Authenticated,
) -> Result<Json<Value>> {
    state.auth().delete_account(&account).await?;
    Ok(Json(json!({ "status": "success" })))
}

// =============================================================================
// Cart
// =============================================================================

/// GET /user/cart
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn view_cart(
    State(state): State<AppState>,
    Authenticated(account): Authenticated,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().view(&account).await?))
}

/// POST /user/cart
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Authenticated(account): Authenticated,
    ApiJson(body): ApiJson<CartItemRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().add(&account, &body.product).await?;
    Ok(Json(CartResponse {
        status: "success",
        cart,
    }))
}

/// DELETE /user/cart
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Authenticated(account): Authenticated,
    ApiJson(body): ApiJson<CartItemRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().remove(&account, &body.product).await?;
    Ok(Json(CartResponse {
        status: "success",
        cart,
    }))
}

/// POST /user/cart/prune
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn prune_cart(
    State(state): State<AppState>,
    Authenticated(account): Authenticated,
) -> Result<Json<Value>> {
    let pruned = state.carts().prune(&account).await?;
    Ok(Json(json!({
        "status": "success",
        "removed": pruned.removed,
        "cart": pruned.cart,
    })))
}
