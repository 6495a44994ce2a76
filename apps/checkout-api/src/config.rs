//! Checkout API configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional
//! `salon.toml` in the working directory, then `SALON__*` environment
//! variables.
//!
//! ```text
//! SALON__HTTP_PORT=9090
//! SALON__DATABASE_PATH=/var/lib/salon/salon.db
//! SALON__SALON_ID=7f7c...
//! SALON__TAX_RATE_BPS=1800
//! SALON__MAX_CONNECTIONS=8
//! ```

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use salon_core::validation::{validate_tax_rate_bps, validate_uuid};
use salon_core::{TaxRate, DEFAULT_SALON_ID};
use salon_db::DbConfig;

/// Checkout API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Bind address
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: String,

    /// Salon used when a request carries no `X-Salon-Id` header
    pub salon_id: String,

    /// GST rate in basis points (1800 = 18%)
    pub tax_rate_bps: u32,

    /// Pool size
    pub max_connections: u32,

    /// How long a writer waits for the SQLite write lock
    pub busy_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_port: 8080,
            bind_addr: "0.0.0.0".to_string(),
            database_path: "./salon.db".to_string(),
            salon_id: DEFAULT_SALON_ID.to_string(),
            tax_rate_bps: 1800,
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from `salon.toml` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(File::with_name("salon").required(false))
            .add_source(
                Environment::with_prefix("SALON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tax_rate_bps(self.tax_rate_bps)
            .map_err(|e| ConfigError::InvalidValue("tax_rate_bps".to_string(), e.to_string()))?;

        validate_uuid("salon_id", &self.salon_id)
            .map_err(|e| ConfigError::InvalidValue("salon_id".to_string(), e.to_string()))?;

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "max_connections".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }

    /// Pool settings for [`salon_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
