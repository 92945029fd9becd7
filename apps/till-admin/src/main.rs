//! # till-admin
//!
//! Operator CLI for Till POS: demo seeding, catalog listing, low-stock and
//! sales reports, database health.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main                                                                   │
//! │   ├── init_tracing()          RUST_LOG or "info,till=debug,sqlx=warn"   │
//! │   ├── TillConfig::load()      defaults → till.toml → TILL_* env         │
//! │   ├── Database::new()         pool + migrations                         │
//! │   └── cli::run(command)       seed | products | low-stock | report |    │
//! │                               health                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;
mod config;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::TillConfig;
use till_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config =
        TillConfig::load(cli.config_path()).context("failed to load configuration")?;
    if let Some(path) = cli.database_override() {
        config.database_path = path.to_path_buf();
    }
    debug!(?config, "Configuration loaded");

    let db = Database::new(config.db_config())
        .await
        .with_context(|| {
            format!(
                "failed to open database at {}",
                config.database_path.display()
            )
        })?;

    let result = cli.run(&db, &config).await;
    db.close().await;
    result
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `info` by default
/// - `debug` for `till_*` targets
/// - `warn` for sqlx (silences per-query logs)
///
/// Override with `RUST_LOG`, e.g. `RUST_LOG=till_db=trace`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
