//! Retailer route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storekeep_core::AccountId;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireRetailer;
use crate::models::{Product, RetailerProfile};
use crate::routes::users::{LoginRequest, TokenResponse};
use crate::state::AppState;

/// Retailer registration request body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerRegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub store_name: String,
}

/// Response for a successful retailer registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerRegisteredResponse {
    pub status: &'static str,
    pub account_id: AccountId,
    pub store_name: String,
}

/// POST /retailer/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RetailerRegisterRequest>,
) -> Result<(StatusCode, Json<RetailerRegisteredResponse>)> {
    let (account, profile) = state
        .auth()
        .register_retailer(&body.name, &body.email, &body.password, &body.store_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RetailerRegisteredResponse {
            status: "success",
            account_id: account.id,
            store_name: profile.store_name,
        }),
    ))
}

/// POST /retailer/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let (_, token) = state
        .auth()
        .login_retailer(&body.email, &body.password)
        .await?;

    Ok(Json(TokenResponse {
        status: "success",
        token,
    }))
}

/// GET /retailer/my-products
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn my_products(
    State(state): State<AppState>,
    RequireRetailer(account): RequireRetailer,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_owned(&account).await?))
}

/// GET /retailer/profile
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireRetailer(account): RequireRetailer,
) -> Result<Json<RetailerProfile>> {
    Ok(Json(state.auth().retailer_profile(&account).await?))
}
