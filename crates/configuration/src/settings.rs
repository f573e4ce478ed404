use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub payment: PaymentSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Rejects settings that would produce an unusable connection pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        for (field, value) in [
            ("database.host", &db.host),
            ("database.username", &db.username),
            ("database.database_name", &db.database_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{field} must be set")));
            }
        }

        let pool = &self.pool;
        if pool.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "pool.max_connections must be greater than zero".to_string(),
            ));
        }
        if pool.min_connections > pool.max_connections {
            return Err(ConfigError::ValidationError(format!(
                "pool.min_connections ({}) exceeds pool.max_connections ({})",
                pool.min_connections, pool.max_connections
            )));
        }
        for (field, value) in [
            ("pool.keepalive_interval_secs", pool.keepalive_interval_secs),
            ("pool.acquire_timeout_secs", pool.acquire_timeout_secs),
            ("pool.query_timeout_secs", pool.query_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{field} must be greater than zero")));
            }
        }

        Ok(())
    }
}

/// Where the single PostgreSQL server hosting every tenant schema lives.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database_name: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// Session time zone applied to every connection.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    #[default]
    Disable,
    Prefer,
    Require,
}

/// Limits applied to every per-tenant connection pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Idle floor kept open per tenant.
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    /// Bound on waiting for a connection, including opening a tenant pool.
    pub acquire_timeout_secs: u64,
    pub keepalive_interval_secs: u64,
    /// Deadline for a single repository operation.
    pub query_timeout_secs: u64,
}

impl PoolSettings {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 100,
            min_connections: 1,
            max_lifetime_secs: 3600,
            acquire_timeout_secs: 5,
            keepalive_interval_secs: 10,
            query_timeout_secs: 30,
        }
    }
}

/// Settings for the payment redirect flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    /// Prefix of the URL the gateway sends the customer back to.
    pub redirect_base_url: String,
    pub currency: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            redirect_base_url: "http://localhost:8080/order".to_string(),
            currency: "RUB".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, e.g. `debug` or `database=trace,info`.
    pub level: String,
    /// When set, logs go to a daily-rolling file in this directory instead of stdout.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            directory: None,
            file_prefix: "tenant-orders.log".to_string(),
        }
    }
}

fn default_port() -> u16 {
    5432
}

fn default_time_zone() -> String {
    "Europe/Moscow".to_string()
}
