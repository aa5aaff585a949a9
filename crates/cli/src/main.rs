//! Storekeep CLI - Database migrations and operator management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! sk-cli migrate
//!
//! # Create an operator (or reset its password)
//! STOREKEEP_OPERATOR_PASSWORD=... sk-cli operator create --username ops
//!
//! # Remove an operator
//! sk-cli operator remove --username ops
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sk-cli")]
#[command(author, version, about = "Storekeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage operator credentials (HTTP Basic catalog access)
    Operator {
        #[command(subcommand)]
        action: OperatorAction,
    },
}

#[derive(Subcommand)]
enum OperatorAction {
    /// Create an operator, or reset its password if it exists.
    ///
    /// The password is read from `STOREKEEP_OPERATOR_PASSWORD`, or from the
    /// first line of stdin if that is unset.
    Create {
        #[arg(short, long)]
        username: String,
    },
    /// Remove an operator
    Remove {
        #[arg(short, long)]
        username: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Operator { action } => match action {
            OperatorAction::Create { username } => {
                commands::operator::create(&username).await?;
            }
            OperatorAction::Remove { username } => {
                commands::operator::remove(&username).await?;
            }
        },
    }
    Ok(())
}
