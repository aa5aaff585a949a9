//! Product catalog route handlers.
//!
//! Reads are public. Writes take a [`ProductWriter`]: an operator (HTTP
//! Basic) may write any product, a retailer (Bearer) only its own.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::instrument;

use storekeep_core::{AccountId, Price};

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::ProductWriter;
use crate::models::{Product, ProductChanges};
use crate::services::ProductDraft;
use crate::state::AppState;

/// Product creation request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub owner_id: Option<AccountId>,
}

impl From<CreateProductRequest> for ProductDraft {
    fn from(body: CreateProductRequest) -> Self {
        Self {
            name: body.name,
            price: body.price,
            description: body.description,
            owner_id: body.owner_id,
        }
    }
}

/// Partial product update request body. An explicit `"description": null`
/// clears the description; an absent key leaves it alone.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

/// Distinguish a key sent as `null` from a missing key.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(body: UpdateProductRequest) -> Self {
        Self {
            name: body.name,
            price: body.price,
            description: body.description,
        }
    }
}

/// GET /products
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list().await?))
}

/// GET /products/{id}
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get(&id).await?))
}

/// POST /products
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    writer: ProductWriter,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create(writer.scope(), body.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /products/{id}
#[instrument(skip(state, writer, body))]
pub async fn update(
    State(state): State<AppState>,
    writer: ProductWriter,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .update(writer.scope(), &id, body.into())
        .await?;
    Ok(Json(product))
}

/// DELETE /products/{id}
#[instrument(skip(state, writer))]
pub async fn delete(
    State(state): State<AppState>,
    writer: ProductWriter,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.catalog().delete(writer.scope(), &id).await?;
    Ok(Json(json!({ "status": "success" })))
}
