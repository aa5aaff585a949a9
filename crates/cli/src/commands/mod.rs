//! CLI subcommands.

pub mod migrate;
pub mod operator;

use secrecy::SecretString;

/// Errors shared by commands that talk to the database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] storekeep_api::config::ConfigError),

    /// Argon2 parameters were rejected.
    #[error("Invalid password hashing parameters: {0}")]
    PasswordHashing(String),

    /// Operator credentials were rejected.
    #[error("{0}")]
    Auth(#[from] storekeep_api::services::AuthError),

    /// Reading the password from stdin failed.
    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),
}

/// Database URL from `STOREKEEP_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    std::env::var("STOREKEEP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREKEEP_DATABASE_URL"))
}
