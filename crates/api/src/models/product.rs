//! Product domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storekeep_core::{AccountId, Price, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    /// Retailer account that owns this product. `None` for operator-managed
    /// products and for products whose owner was deleted.
    pub owner_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    pub owner_id: Option<AccountId>,
}

/// Partial product update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Price>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl ProductChanges {
    /// Returns true if no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.description.is_none()
    }
}

/// Which products a writer may modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// Any product (operators).
    Any,
    /// Only products owned by the given retailer.
    OwnedBy(AccountId),
}

impl WriteScope {
    /// Returns true if a product with this owner is writable in this scope.
    #[must_use]
    pub fn permits(&self, owner_id: Option<AccountId>) -> bool {
        match self {
            Self::Any => true,
            Self::OwnedBy(account) => owner_id == Some(*account),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_permits() {
        let owner = AccountId::generate();
        let other = AccountId::generate();

        assert!(WriteScope::Any.permits(None));
        assert!(WriteScope::Any.permits(Some(other)));
        assert!(WriteScope::OwnedBy(owner).permits(Some(owner)));
        assert!(!WriteScope::OwnedBy(owner).permits(Some(other)));
        assert!(!WriteScope::OwnedBy(owner).permits(None));
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(ProductChanges::default().is_empty());
        let changes = ProductChanges {
            description: Some(None),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
