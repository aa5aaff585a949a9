//! `PostgreSQL` account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storekeep_core::{AccountId, Email, ProductId, Role};

use super::{AccountRepository, CartPush, PrunedCart, RepositoryError, map_unique_violation};
use crate::models::{Account, AccountChanges, NewAccount, RetailerProfile};

const ACCOUNT_COLUMNS: &str =
    "id, name, email, role::text AS role, cart, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    name: String,
    email: String,
    role: String,
    cart: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = r.role.parse::<Role>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            name: r.name,
            email,
            role,
            cart: to_product_ids(r.cart),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccountWithHashRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    account_id: AccountId,
    store_name: String,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for RetailerProfile {
    fn from(r: ProfileRow) -> Self {
        Self {
            account_id: r.account_id,
            store_name: r.store_name,
            created_at: r.created_at,
        }
    }
}

fn to_product_ids(cart: Vec<Uuid>) -> Vec<ProductId> {
    cart.into_iter().map(ProductId::new).collect()
}

/// Account repository backed by `shop.account`.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.account WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

fn insert_account_sql() -> String {
    format!(
        "INSERT INTO shop.account (id, name, email, role, password_hash)
         VALUES ($1, $2, $3, $4::shop.account_role, $5)
         RETURNING {ACCOUNT_COLUMNS}"
    )
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let row: AccountRow = sqlx::query_as(&insert_account_sql())
            .bind(AccountId::generate())
            .bind(&account.name)
            .bind(account.email.as_str())
            .bind(account.role.as_str())
            .bind(&account.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email already exists"))?;

        row.try_into()
    }

    async fn create_retailer(
        &self,
        account: NewAccount,
        store_name: &str,
    ) -> Result<(Account, RetailerProfile), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: AccountRow = sqlx::query_as(&insert_account_sql())
            .bind(AccountId::generate())
            .bind(&account.name)
            .bind(account.email.as_str())
            .bind(Role::Retailer.as_str())
            .bind(&account.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "email already exists"))?;

        let profile: ProfileRow = sqlx::query_as(
            r"
            INSERT INTO shop.retailer_profile (account_id, store_name)
            VALUES ($1, $2)
            RETURNING account_id, store_name, created_at
            ",
        )
        .bind(row.id)
        .bind(store_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((row.try_into()?, profile.into()))
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM shop.account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let row: Option<AccountWithHashRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM shop.account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.account.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn update_password_hash(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.account
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<Account, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "UPDATE shop.account
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 password_hash = COALESCE($4, password_hash),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.email.as_ref().map(Email::as_str))
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email already exists"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn push_cart_item(
        &self,
        id: AccountId,
        product: ProductId,
    ) -> Result<CartPush, RepositoryError> {
        let cart: Option<Vec<Uuid>> = sqlx::query_scalar(
            r"
            UPDATE shop.account
            SET cart = array_append(cart, $2), updated_at = NOW()
            WHERE id = $1
              AND EXISTS (SELECT 1 FROM shop.product WHERE id = $2)
            RETURNING cart
            ",
        )
        .bind(id)
        .bind(product)
        .fetch_optional(&self.pool)
        .await?;

        match cart {
            Some(cart) => Ok(CartPush::Pushed(to_product_ids(cart))),
            None if self.account_exists(id).await? => Ok(CartPush::ProductMissing),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn remove_cart_item(
        &self,
        id: AccountId,
        product: ProductId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        // Slices around the first match; an absent entry keeps the array as is.
        let cart: Option<Vec<Uuid>> = sqlx::query_scalar(
            r"
            UPDATE shop.account
            SET cart = CASE
                    WHEN array_position(cart, $2) IS NULL THEN cart
                    ELSE cart[:array_position(cart, $2) - 1]
                         || cart[array_position(cart, $2) + 1:]
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING cart
            ",
        )
        .bind(id)
        .bind(product)
        .fetch_optional(&self.pool)
        .await?;

        cart.map(to_product_ids).ok_or(RepositoryError::NotFound)
    }

    async fn prune_cart(&self, id: AccountId) -> Result<PrunedCart, RepositoryError> {
        let row: Option<(Vec<Uuid>, i32)> = sqlx::query_as(
            r"
            WITH snapshot AS (
                SELECT id, cardinality(cart) AS before
                FROM shop.account
                WHERE id = $1
                FOR UPDATE
            )
            UPDATE shop.account AS a
            SET cart = ARRAY(
                    SELECT c.item
                    FROM unnest(a.cart) WITH ORDINALITY AS c(item, position)
                    WHERE EXISTS (SELECT 1 FROM shop.product p WHERE p.id = c.item)
                    ORDER BY c.position
                ),
                updated_at = NOW()
            FROM snapshot s
            WHERE a.id = s.id
            RETURNING a.cart, s.before - cardinality(a.cart)
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let (cart, removed) = row.ok_or(RepositoryError::NotFound)?;
        let removed = usize::try_from(removed).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative prune count {removed}"))
        })?;

        Ok(PrunedCart {
            cart: to_product_ids(cart),
            removed,
        })
    }

    async fn get_retailer_profile(
        &self,
        id: AccountId,
    ) -> Result<Option<RetailerProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r"
            SELECT account_id, store_name, created_at
            FROM shop.retailer_profile
            WHERE account_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
