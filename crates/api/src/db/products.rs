//! `PostgreSQL` product repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storekeep_core::{AccountId, Price, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product, ProductChanges, WriteScope};

const PRODUCT_COLUMNS: &str = "id, name, price, description, owner_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    description: Option<String>,
    owner_id: Option<AccountId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            price: r.price,
            description: r.description,
            owner_id: r.owner_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Owner filter for scoped writes; `NULL` means unrestricted.
const fn scope_owner(scope: WriteScope) -> Option<AccountId> {
    match scope {
        WriteScope::Any => None,
        WriteScope::OwnedBy(owner) => Some(owner),
    }
}

/// Product repository backed by `shop.product`.
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_owner(&self, owner: AccountId) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE owner_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO shop.product (id, name, price, description, owner_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(ProductId::generate())
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(product.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("owner account no longer exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
        scope: WriteScope,
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE shop.product
             SET name = COALESCE($2, name),
                 price = COALESCE($3, price),
                 description = CASE WHEN $4 THEN $5 ELSE description END,
                 updated_at = NOW()
             WHERE id = $1 AND ($6::uuid IS NULL OR owner_id = $6)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.price)
        .bind(changes.description.is_some())
        .bind(changes.description.as_ref().and_then(Option::as_deref))
        .bind(scope_owner(scope))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: ProductId, scope: WriteScope) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.product
            WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)
            ",
        )
        .bind(id)
        .bind(scope_owner(scope))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
