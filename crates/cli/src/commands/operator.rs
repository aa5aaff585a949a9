//! Operator credential management.
//!
//! Operators authenticate with HTTP Basic and may write any catalog product.
//! The password is hashed with the Argon2 costs from `STOREKEEP_HASH_*`, the
//! same variables the server reads.
//!
//! # Usage
//!
//! ```bash
//! STOREKEEP_OPERATOR_PASSWORD=... sk-cli operator create -u ops
//! echo "$PASSWORD" | sk-cli operator create -u ops
//! sk-cli operator remove -u ops
//! ```
//!
//! # Environment Variables
//!
//! - `STOREKEEP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `STOREKEEP_OPERATOR_PASSWORD` - Password for `create` (else read from stdin)

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};

use storekeep_api::config::PasswordHashConfig;
use storekeep_api::db::{Repositories, create_pool};
use storekeep_api::services::{PasswordHasher, delete_operator, store_operator};

use super::{CommandError, database_url};

/// Create an operator or reset its password.
pub async fn create(username: &str) -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let hasher = PasswordHasher::new(&PasswordHashConfig::from_env()?)
        .map_err(CommandError::PasswordHashing)?;
    let password = read_password()?;
    let repos = connect().await?;

    let operator = store_operator(
        repos.operators.as_ref(),
        &hasher,
        username,
        password.expose_secret(),
    )
    .await?;

    tracing::info!(
        "Operator ready! ID: {}, Username: {}",
        operator.id,
        operator.username
    );
    Ok(())
}

/// Remove an operator.
pub async fn remove(username: &str) -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let repos = connect().await?;

    if delete_operator(repos.operators.as_ref(), username).await? {
        tracing::info!("Operator removed: {}", username);
    } else {
        tracing::warn!("No operator named {}", username);
    }
    Ok(())
}

async fn connect() -> Result<Repositories, CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;
    Ok(Repositories::postgres(pool))
}

fn read_password() -> Result<SecretString, CommandError> {
    if let Ok(password) = std::env::var("STOREKEEP_OPERATOR_PASSWORD") {
        return Ok(SecretString::from(password));
    }

    tracing::info!("Reading password from stdin...");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_owned(),
    ))
}
