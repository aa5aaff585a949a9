//! Storage for accounts, products, and operators.
//!
//! # Backends
//!
//! - `PostgreSQL` (schema `shop`), the production backend
//! - [`MemoryStore`], a process-local store with the same semantics for
//!   development and tests
//!
//! Handlers and services only see the repository traits below, reached through
//! [`Repositories`].
//!
//! ## Tables
//!
//! - `account` - Customers and retailers, with the cart as an ordered `uuid[]`
//! - `retailer_profile` - Store name for retailer accounts
//! - `product` - Catalog, optionally owned by a retailer account
//! - `operator` - HTTP Basic back-office credentials
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storekeep-cli -- migrate
//! ```
//!
//! # Cart atomicity
//!
//! Cart membership changes are single statements (`PostgreSQL`) or run under
//! one write lock (memory), so concurrent adds and removes on the same account
//! never lose updates.

pub mod accounts;
pub mod memory;
pub mod operators;
pub mod products;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use storekeep_core::{AccountId, Email, ProductId};

use crate::models::{
    Account, AccountChanges, NewAccount, NewProduct, Operator, Product, ProductChanges,
    RetailerProfile, WriteScope,
};

pub use accounts::PgAccountRepository;
pub use memory::MemoryStore;
pub use operators::PgOperatorRepository;
pub use products::PgProductRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Outcome of appending to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartPush {
    /// The product was appended; holds the cart after the change.
    Pushed(Vec<ProductId>),
    /// The referenced product does not exist; nothing was written.
    ProductMissing,
}

/// Cart after dropping dangling references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedCart {
    pub cart: Vec<ProductId>,
    pub removed: usize,
}

/// Account storage.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Insert a retailer account and its store profile together.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken; in that case
    /// neither row is written.
    async fn create_retailer(
        &self,
        account: NewAccount,
        store_name: &str,
    ) -> Result<(Account, RetailerProfile), RepositoryError>;

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Look up an account and its password hash by login email.
    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError>;

    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn update_password_hash(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;

    /// Apply `changes` to an account.
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist and
    /// `RepositoryError::Conflict` if the new email is taken.
    async fn update(&self, id: AccountId, changes: &AccountChanges)
    -> Result<Account, RepositoryError>;

    /// Delete an account. Products it owned are kept with no owner.
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError>;

    /// Append a product to the end of the cart if the product exists.
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn push_cart_item(
        &self,
        id: AccountId,
        product: ProductId,
    ) -> Result<CartPush, RepositoryError>;

    /// Remove the first occurrence of `product` from the cart. Absent entries
    /// leave the cart unchanged.
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn remove_cart_item(
        &self,
        id: AccountId,
        product: ProductId,
    ) -> Result<Vec<ProductId>, RepositoryError>;

    /// Drop every cart entry whose product no longer exists, keeping order.
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn prune_cart(&self, id: AccountId) -> Result<PrunedCart, RepositoryError>;

    async fn get_retailer_profile(
        &self,
        id: AccountId,
    ) -> Result<Option<RetailerProfile>, RepositoryError>;
}

/// Product storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products, oldest first.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch every existing product among `ids`. Missing ids are skipped;
    /// order of the result is unspecified.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn list_by_owner(&self, owner: AccountId) -> Result<Vec<Product>, RepositoryError>;

    /// Returns `RepositoryError::Conflict` if the owner vanished meanwhile.
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply `changes` to a product inside `scope`. `None` if no such product
    /// is visible in the scope.
    async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
        scope: WriteScope,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product inside `scope`. `false` if nothing was deleted.
    async fn delete(&self, id: ProductId, scope: WriteScope) -> Result<bool, RepositoryError>;
}

/// Operator credential storage.
#[async_trait]
pub trait OperatorRepository: Send + Sync {
    async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Operator, String)>, RepositoryError>;

    /// Create the operator, or replace its password hash if it already exists.
    async fn upsert(&self, username: &str, password_hash: &str)
    -> Result<Operator, RepositoryError>;

    /// `false` if there was no such operator.
    async fn delete(&self, username: &str) -> Result<bool, RepositoryError>;
}

/// Handles to every repository, shared through application state.
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub operators: Arc<dyn OperatorRepository>,
    pool: Option<PgPool>,
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            operators: Arc::new(PgOperatorRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Repositories backed by a fresh, empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = MemoryStore::new();
        Self {
            accounts: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            operators: Arc::new(store),
            pool: None,
        }
    }

    /// Check that the backing store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database does not answer.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-violation to `RepositoryError::Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}
