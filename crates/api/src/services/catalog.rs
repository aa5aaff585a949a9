//! Product catalog operations.
//!
//! Reads are public. Writes are scoped: operators may touch any product,
//! retailers only their own. A product outside the writer's scope is reported
//! as not found rather than forbidden, so retailers cannot discover other
//! stores' products.

use thiserror::Error;
use tracing::instrument;

use storekeep_core::{AccountId, Price, ProductId, Role};

use crate::db::{AccountRepository, ProductRepository, Repositories, RepositoryError};
use crate::models::{Account, NewProduct, Product, ProductChanges, WriteScope};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No such product (or not writable in the caller's scope).
    #[error("product not found")]
    NotFound,

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Unvalidated product input as received from a client.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub owner_id: Option<AccountId>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: &'a dyn ProductRepository,
    accounts: &'a dyn AccountRepository,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(repos: &'a Repositories) -> Self {
        Self {
            products: repos.products.as_ref(),
            accounts: repos.accounts.as_ref(),
        }
    }

    /// List every product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list().await?)
    }

    /// Get a product by its textual id. Malformed ids are simply not found.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if there is no such product.
    pub async fn get(&self, id: &str) -> Result<Product, CatalogError> {
        let id = parse_id(id)?;
        self.products.get(id).await?.ok_or(CatalogError::NotFound)
    }

    /// Products owned by a retailer.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_owned(&self, owner: &Account) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_by_owner(owner.id).await?)
    }

    /// Create a product.
    ///
    /// Retailers always own what they create. Operators may assign an owner,
    /// which must be a retailer account.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a missing name or price, or an
    /// owner that is not a retailer.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, scope: WriteScope, draft: ProductDraft) -> Result<Product, CatalogError> {
        let name = required_name(draft.name.as_deref())?;
        let price = draft
            .price
            .ok_or_else(|| CatalogError::Validation("price is required".to_owned()))?;

        let owner_id = match (scope, draft.owner_id) {
            (WriteScope::OwnedBy(retailer), None) => Some(retailer),
            (WriteScope::OwnedBy(retailer), Some(requested)) if requested == retailer => {
                Some(retailer)
            }
            (WriteScope::OwnedBy(_), Some(_)) => {
                return Err(CatalogError::Validation(
                    "retailers can only create their own products".to_owned(),
                ));
            }
            (WriteScope::Any, None) => None,
            (WriteScope::Any, Some(requested)) => {
                self.ensure_retailer(requested).await?;
                Some(requested)
            }
        };

        let product = self
            .products
            .create(NewProduct {
                name,
                price,
                description: draft.description,
                owner_id,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => CatalogError::Validation(msg),
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if nothing would change or the new
    /// name is blank; `CatalogError::NotFound` if the product is absent or
    /// outside `scope`.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        scope: WriteScope,
        id: &str,
        mut changes: ProductChanges,
    ) -> Result<Product, CatalogError> {
        let id = parse_id(id)?;
        if changes.is_empty() {
            return Err(CatalogError::Validation("no changes given".to_owned()));
        }
        if let Some(name) = changes.name.take() {
            changes.name = Some(required_name(Some(&name))?);
        }

        let product = self
            .products
            .update(id, &changes, scope)
            .await?
            .ok_or(CatalogError::NotFound)?;

        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Delete a product. Carts that reference it keep a dangling entry.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is absent or outside
    /// `scope`.
    #[instrument(skip(self))]
    pub async fn delete(&self, scope: WriteScope, id: &str) -> Result<(), CatalogError> {
        let id = parse_id(id)?;
        if !self.products.delete(id, scope).await? {
            return Err(CatalogError::NotFound);
        }

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn ensure_retailer(&self, id: AccountId) -> Result<(), CatalogError> {
        match self.accounts.get_by_id(id).await? {
            Some(account) if account.role == Role::Retailer => Ok(()),
            _ => Err(CatalogError::Validation(
                "ownerId must reference a retailer account".to_owned(),
            )),
        }
    }
}

fn parse_id(id: &str) -> Result<ProductId, CatalogError> {
    id.parse().map_err(|_| CatalogError::NotFound)
}

fn required_name(name: Option<&str>) -> Result<String, CatalogError> {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_owned()),
        _ => Err(CatalogError::Validation("name is required".to_owned())),
    }
}
