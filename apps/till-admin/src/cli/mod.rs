use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use till_core::{Principal, Role};
use till_db::Database;

use crate::config::TillConfig;

mod health;
mod products;
mod report;
mod seed;

#[derive(Debug, Parser)]
#[command(name = "till-admin", about = "Till POS operator tools", long_about = None)]
pub(crate) struct Cli {
    /// Configuration file (defaults to ./till.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Insert the demo catalog into an empty database
    Seed,
    /// List or search the catalog
    Products(products::ProductsArgs),
    /// List products at or below their low-stock threshold
    LowStock,
    /// Sales and inventory report
    Report(report::ReportArgs),
    /// Check database connectivity and migrations
    Health,
}

impl Cli {
    pub(crate) fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub(crate) fn database_override(&self) -> Option<&Path> {
        self.database.as_deref()
    }

    pub(crate) async fn run(self, db: &Database, config: &TillConfig) -> anyhow::Result<()> {
        match self.command {
            Commands::Seed => seed::run(db).await,
            Commands::Products(args) => products::run(args, db, config).await,
            Commands::LowStock => products::run_low_stock(db, config).await,
            Commands::Report(args) => report::run(args, db, config).await,
            Commands::Health => health::run(db).await,
        }
    }
}

/// Identity the CLI acts under. Whoever can run it has shell access to the
/// database file already.
fn operator() -> Principal {
    Principal::new("till-admin", "Till Admin CLI", Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["till-admin", "report", "--json", "--database", "x.db"]).unwrap();
        assert_eq!(cli.database_override(), Some(Path::new("x.db")));
        assert!(matches!(cli.command, Commands::Report(ref args) if args.json));
    }
}
