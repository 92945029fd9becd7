//! CLI configuration.
//!
//! Layered with the `config` crate, later sources winning:
//!
//! ```text
//! built-in defaults ──► till.toml (optional) ──► TILL_* environment
//! ```
//!
//! `TILL_DATABASE_PATH=/var/lib/till/till.db` overrides `database_path`, and
//! so on for every field.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use till_db::DbConfig;

/// Config file read when no `--config` is given. Missing is fine.
const DEFAULT_CONFIG_FILE: &str = "till.toml";

/// Largest UTC offset in use anywhere (UTC+14).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Till POS operator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TillConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub max_connections: u32,

    /// Store name printed on reports
    pub store_name: String,

    /// Currency symbol used when printing amounts
    pub currency_symbol: String,

    /// Offset of the reporting day from UTC, in minutes (480 for UTC+8)
    pub report_utc_offset_minutes: i32,

    /// Rows in the top-products report
    pub top_products_limit: usize,

    /// Days in the daily revenue window
    pub report_days: u32,
}

impl TillConfig {
    /// Loads configuration from defaults, the config file and the environment.
    ///
    /// An explicitly given `path` must exist; the default `till.toml` may not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Self::defaults()?.add_source(file).add_source(
            Environment::with_prefix("TILL").try_parsing(true),
        );

        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("database_path", "till.db")?
            .set_default("max_connections", 5_i64)?
            .set_default("store_name", "Till POS")?
            .set_default("currency_symbol", "₱")?
            .set_default("report_utc_offset_minutes", 0_i64)?
            .set_default("top_products_limit", 5_i64)?
            .set_default("report_days", 7_i64)?)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        let config: TillConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.report_utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::InvalidValue(
                "report_utc_offset_minutes".to_string(),
            ));
        }
        if self.report_days == 0 || self.report_days > 366 {
            return Err(ConfigError::InvalidValue("report_days".to_string()));
        }
        Ok(())
    }

    /// Fixed offset that defines a reporting day.
    pub fn report_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.report_utc_offset_minutes * 60)
            .ok_or_else(|| ConfigError::InvalidValue("report_utc_offset_minutes".to_string()))
    }

    /// Pool settings for [`till_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}
