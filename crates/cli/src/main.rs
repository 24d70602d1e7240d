//! Parlour CLI - database migrations and operator checks.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! parlour-cli migrate
//!
//! # Validate the server environment without starting it
//! parlour-cli check-config
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "parlour-cli")]
#[command(author, version, about = "Parlour CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load and validate the server configuration from the environment
    CheckConfig,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::CheckConfig => commands::config::check()?,
    }
    Ok(())
}
