//! LucidSync CLI - Database migrations and key management.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! lucidsync migrate
//!
//! # Print a fresh TOKEN_ENCRYPTION_KEY
//! lucidsync keygen
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lucidsync")]
#[command(author, version, about = "LucidSync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Generate a base64 key for `TOKEN_ENCRYPTION_KEY`
    Keygen,
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
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Keygen => commands::keygen::print_key(),
    }
    Ok(())
}
