//! `PostgreSQL` operator repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storekeep_core::OperatorId;

use super::{OperatorRepository, RepositoryError};
use crate::models::Operator;

#[derive(sqlx::FromRow)]
struct OperatorRow {
    id: OperatorId,
    username: String,
    created_at: DateTime<Utc>,
}

impl From<OperatorRow> for Operator {
    fn from(r: OperatorRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OperatorWithHashRow {
    #[sqlx(flatten)]
    operator: OperatorRow,
    password_hash: String,
}

/// Operator repository backed by `shop.operator`.
#[derive(Clone)]
pub struct PgOperatorRepository {
    pool: PgPool,
}

impl PgOperatorRepository {
    /// Create a new operator repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperatorRepository for PgOperatorRepository {
    async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Operator, String)>, RepositoryError> {
        let row: Option<OperatorWithHashRow> = sqlx::query_as(
            r"
            SELECT id, username, created_at, password_hash
            FROM shop.operator
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.operator.into(), r.password_hash)))
    }

    async fn upsert(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Operator, RepositoryError> {
        let row: OperatorRow = sqlx::query_as(
            r"
            INSERT INTO shop.operator (id, username, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
            RETURNING id, username, created_at
            ",
        )
        .bind(OperatorId::generate())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, username: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.operator WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
