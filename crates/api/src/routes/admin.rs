//! Operator account administration handlers.
//!
//! Every route here requires HTTP Basic operator credentials.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireOperator;
use crate::models::Account;
use crate::services::AccountUpdate;
use crate::state::AppState;

/// Account update request body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// PATCH /admin/users/{id}
#[instrument(skip(state, operator, body), fields(operator = %operator.username))]
pub async fn update_account(
    State(state): State<AppState>,
    RequireOperator(operator): RequireOperator,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateAccountRequest>,
) -> Result<Json<Account>> {
    let account = state
        .auth()
        .update_account(
            &id,
            AccountUpdate {
                name: body.name.as_deref(),
                email: body.email.as_deref(),
                password: body.password.as_deref(),
            },
        )
        .await?;
    Ok(Json(account))
}

/// DELETE /admin/users/{id}
#[instrument(skip(state, operator), fields(operator = %operator.username))]
pub async fn delete_account(
    State(state): State<AppState>,
    RequireOperator(operator): RequireOperator,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.auth().remove_account(&id).await?;
    Ok(Json(json!({ "status": "success" })))
}
