//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! sk-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREKEEP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the API
//! crate, so this binary always applies the schema the server expects.

use storekeep_api::db::{MIGRATOR, create_pool};

use super::{CommandError, database_url};

/// Apply all pending migrations.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
