//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storekeep_core::{AccountId, Email, ProductId, Role};

/// A registered customer or retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Login email (unique, normalized).
    pub email: Email,
    /// Role, fixed at registration.
    pub role: Role,
    /// Cart entries in insertion order. Duplicates are allowed and entries may
    /// point at products that no longer exist.
    pub cart: Vec<ProductId>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub password_hash: String,
}

/// Store profile attached to a retailer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerProfile {
    pub account_id: AccountId,
    pub store_name: String,
    pub created_at: DateTime<Utc>,
}

/// Operator-applied account update. `None` leaves the field unchanged; the
/// password is already hashed.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
}

impl AccountChanges {
    /// Returns true if no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}
