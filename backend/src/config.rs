//! Configuration management for the stock ledger server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LEDGER_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token verification configuration
    pub jwt: JwtConfig,

    /// Ledger tuning
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret used to verify bearer tokens issued by the auth service
    pub secret: String,
}

/// Where ledger events are kept
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Event store backend
    pub store: StoreBackend,

    /// Multiple of the minimum stock level that counts as efficient stock
    pub efficiency_factor: Decimal,

    /// Rows returned by the material ("top movers") report
    pub top_movers_limit: usize,

    /// Low-stock alerts surfaced on the dashboard
    pub critical_alert_limit: usize,

    /// Length of each trend comparison window
    pub trend_window_days: i64,

    /// Activity feed length when the caller gives none
    pub activity_feed_limit: usize,

    /// Largest activity feed a caller may request
    pub max_activity_feed_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Postgres,
            efficiency_factor: Decimal::new(12, 1),
            top_movers_limit: 10,
            critical_alert_limit: 5,
            trend_window_days: 7,
            activity_feed_limit: 10,
            max_activity_feed_limit: 100,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.secret", "development-secret-key")?
            .set_default("ledger.store", "postgres")?
            .set_default("ledger.efficiency_factor", "1.2")?
            .set_default("ledger.top_movers_limit", 10)?
            .set_default("ledger.critical_alert_limit", 5)?
            .set_default("ledger.trend_window_days", 7)?
            .set_default("ledger.activity_feed_limit", 10)?
            .set_default("ledger.max_activity_feed_limit", 100)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LEDGER_ prefix)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.store == StoreBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required for the postgres store".to_string(),
            ));
        }
        if self.ledger.efficiency_factor < Decimal::ONE {
            return Err(ConfigError::Message(
                "ledger.efficiency_factor must be at least 1".to_string(),
            ));
        }
        if self.ledger.activity_feed_limit > self.ledger.max_activity_feed_limit {
            return Err(ConfigError::Message(
                "ledger.activity_feed_limit exceeds ledger.max_activity_feed_limit".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
