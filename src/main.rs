//! # Quotes daemon (`quotesd`)
//!
//! CLI entry point for the Bitable quotes service.
//!
//! ## Usage
//!
//! ```bash
//! quotesd --config ./config/quotes.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quotesd serve` | Start the HTTP server |
//! | `quotesd fetch` | Run the read path once and print the payload JSON |
//! | `quotesd fields` | List the table's field metadata |
//!
//! Credentials and table identifiers come from the environment:
//! `FEISHU_APP_ID`, `FEISHU_APP_SECRET`, `FEISHU_BASE_TOKEN`,
//! `FEISHU_TABLE_ID`, optionally `FEISHU_VIEW_ID` and
//! `FEISHU_CACHE_TTL_MINUTES`. The TOML file carries the bind address,
//! cache path, and upstream origin; a missing file falls back to defaults.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bitable_quotes::client::BitableClient;
use bitable_quotes::config::Config;
use bitable_quotes::server;
use bitable_quotes::service::QuoteService;
use bitable_quotes::store::file::FileStore;

/// Bitable quotes service — a cached, normalized HTTP view over a Feishu
/// Bitable quotes table.
#[derive(Parser)]
#[command(
    name = "quotesd",
    about = "Cached, normalized HTTP view over a Feishu Bitable quotes table",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Holds the bind address, cache path, and upstream origin. Credentials
    /// are read from FEISHU_* environment variables, never from this file.
    #[arg(long, global = true, default_value = "./config/quotes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,

    /// Run the read path once and print the payload JSON to stdout.
    ///
    /// Serves from the cache when fresh, exactly like the HTTP endpoint.
    Fetch {
        /// Bypass the cache and force an upstream refresh.
        #[arg(long)]
        refresh: bool,
    },

    /// List the table's field metadata (id, name, type per column).
    ///
    /// Useful for checking which columns the normalizer will see before
    /// pointing the service at a new table.
    Fields,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => server::run_server(&config).await?,
        Commands::Fetch { refresh } => run_fetch(&config, refresh).await?,
        Commands::Fields => run_fields(&config).await?,
    }

    Ok(())
}

async fn run_fetch(config: &Config, refresh: bool) -> Result<()> {
    let service = QuoteService::new(BitableClient::new(config)?);
    let store = FileStore::new(config.cache.path.clone());

    let outcome = service
        .read_through(&store, config.ttl(), refresh, chrono::Utc::now())
        .await?;

    println!("{}", serde_json::to_string_pretty(outcome.payload())?);
    Ok(())
}

async fn run_fields(config: &Config) -> Result<()> {
    let client = BitableClient::new(config)?;
    let token = client.tenant_access_token().await?;
    let fields = client.list_fields(&token).await?;

    println!("{:<24} {:<24} TYPE", "ID", "NAME");
    for field in &fields {
        println!("{:<24} {:<24} {}", field.id, field.name, field.field_type);
    }

    Ok(())
}
