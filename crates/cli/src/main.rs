//! Trinity CLI - Database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run PostgreSQL migrations
//! trinity-cli migrate
//!
//! # Seed the configured store from a YAML file
//! trinity-cli seed --file fixtures/shop.yaml
//!
//! # Seed a JSON data directory regardless of TRINITY_STORAGE
//! trinity-cli seed --file fixtures/shop.yaml --storage json --data-dir data
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Create users and products from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "trinity-cli")]
#[command(author, version, about = "Trinity CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed users and products from a YAML file
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long)]
        file: PathBuf,

        /// Backend to seed (defaults to `TRINITY_STORAGE`)
        #[arg(long, value_enum)]
        storage: Option<commands::seed::SeedBackend>,

        /// Directory holding the JSON files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed {
            file,
            storage,
            data_dir,
        } => commands::seed::run(&file, storage, data_dir).await?,
    }
    Ok(())
}
