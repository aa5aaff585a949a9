//! Cart operations and read-time reconciliation.
//!
//! Cart entries are weak references to products. A product can be deleted
//! while it sits in carts, so reads resolve each entry against the live
//! catalog and count the ones that no longer resolve instead of failing.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use storekeep_core::ProductId;

use crate::db::{
    AccountRepository, CartPush, ProductRepository, PrunedCart, Repositories, RepositoryError,
};
use crate::models::{Account, Product};

/// A cart as presented to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Products still in the catalog, in cart order, duplicates kept.
    pub items: Vec<Product>,
    /// Number of entries whose product no longer exists.
    pub unavailable: usize,
}

/// Resolve cart entries against live products.
///
/// Order and duplicates of resolvable entries are preserved; unresolvable
/// entries are counted. The input is never modified.
#[must_use]
pub fn reconcile(cart: &[ProductId], live: &HashMap<ProductId, Product>) -> CartView {
    let mut items = Vec::with_capacity(cart.len());
    let mut unavailable = 0;

    for id in cart {
        match live.get(id) {
            Some(product) => items.push(product.clone()),
            None => unavailable += 1,
        }
    }

    CartView { items, unavailable }
}

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The reference is malformed or names no existing product.
    #[error("not a product")]
    ProductNotFound,

    /// The cart's account no longer exists.
    #[error("account no longer exists")]
    AccountNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::AccountNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Cart service for one authenticated account at a time.
pub struct CartService<'a> {
    accounts: &'a dyn AccountRepository,
    products: &'a dyn ProductRepository,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub fn new(repos: &'a Repositories) -> Self {
        Self {
            accounts: repos.accounts.as_ref(),
            products: repos.products.as_ref(),
        }
    }

    /// Reconciled view of the account's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the product lookup fails.
    pub async fn view(&self, account: &Account) -> Result<CartView, CartError> {
        let mut distinct = account.cart.clone();
        distinct.sort_unstable();
        distinct.dedup();

        let live: HashMap<ProductId, Product> = self
            .products
            .get_many(&distinct)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(reconcile(&account.cart, &live))
    }

    /// Append a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if `product_ref` is not the id of
    /// an existing product.
    #[instrument(skip_all, fields(account_id = %account.id))]
    pub async fn add(&self, account: &Account, product_ref: &str) -> Result<Vec<ProductId>, CartError> {
        let product: ProductId = product_ref
            .parse()
            .map_err(|_| CartError::ProductNotFound)?;

        match self.accounts.push_cart_item(account.id, product).await? {
            CartPush::Pushed(cart) => {
                tracing::debug!(product_id = %product, "Added to cart");
                Ok(cart)
            }
            CartPush::ProductMissing => Err(CartError::ProductNotFound),
        }
    }

    /// Remove the first occurrence of a product from the cart.
    ///
    /// Removing something that is not in the cart (including a malformed
    /// reference) succeeds and leaves the cart unchanged. Stale references to
    /// deleted products stay removable.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AccountNotFound` if the account vanished.
    #[instrument(skip_all, fields(account_id = %account.id))]
    pub async fn remove(
        &self,
        account: &Account,
        product_ref: &str,
    ) -> Result<Vec<ProductId>, CartError> {
        let Ok(product) = product_ref.parse::<ProductId>() else {
            return Ok(account.cart.clone());
        };

        Ok(self.accounts.remove_cart_item(account.id, product).await?)
    }

    /// Drop every dangling reference from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AccountNotFound` if the account vanished.
    #[instrument(skip_all, fields(account_id = %account.id))]
    pub async fn prune(&self, account: &Account) -> Result<PrunedCart, CartError> {
        let pruned = self.accounts.prune_cart(account.id).await?;
        if pruned.removed > 0 {
            tracing::info!(removed = pruned.removed, "Pruned cart");
        }
        Ok(pruned)
    }
}
