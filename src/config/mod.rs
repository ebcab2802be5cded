//! Application configuration: TOML file + environment overlay, following
//! the field/default-fn pattern `storage::database::DatabaseConfig` uses
//! elsewhere in this codebase.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_request_timeout")]
    pub api_request_timeout_secs: u64,
    #[serde(default = "default_connection_timeout")]
    pub api_connection_timeout_secs: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub api_retry_max_attempts: u32,
    #[serde(default = "default_retry_backoff_factor")]
    pub api_retry_backoff_factor: f64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_exchange_rate_ttl")]
    pub exchange_rate_ttl_seconds: u64,
    #[serde(default = "default_ingest_batch_size")]
    pub ingest_batch_size: usize,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite://path/to/db.sqlite` or `sqlite::memory:`. Postgres URLs are
    /// accepted too; the connector/store that opens the pool decides which
    /// driver to use based on the scheme.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_connection_timeout() -> u64 {
    10
}
fn default_retry_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_factor() -> f64 {
    1.5
}
fn default_cache_ttl() -> u64 {
    3600
}
fn default_exchange_rate_ttl() -> u64 {
    86400
}
fn default_ingest_batch_size() -> usize {
    1000
}
fn default_database_url() -> String {
    "sqlite://fpma.db".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_run_migrations() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            api_request_timeout_secs: default_request_timeout(),
            api_connection_timeout_secs: default_connection_timeout(),
            api_retry_max_attempts: default_retry_max_attempts(),
            api_retry_backoff_factor: default_retry_backoff_factor(),
            cache_ttl_seconds: default_cache_ttl(),
            exchange_rate_ttl_seconds: default_exchange_rate_ttl(),
            ingest_batch_size: default_ingest_batch_size(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads a TOML file, then overlays `FPMA_*` environment variables via
    /// `figment`.
    pub fn from_file(path: &Path) -> Result<Self> {
        use figment::providers::{Env, Format, Toml};
        use figment::Figment;

        let config: Self = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FPMA_"))
            .extract()
            .map_err(|e| crate::error::FpmaError::configuration(format!("failed to load config: {e}")))?;
        Ok(config)
    }

    /// Builds a config entirely from `FPMA_*` environment variables (or
    /// their bare knob-name fallbacks), with no file on disk.
    pub fn from_env() -> Result<Self> {
        use figment::providers::Env;
        use figment::Figment;

        let config: Self = Figment::from(figment::providers::Serialized::defaults(Self::default()))
            .merge(Env::raw())
            .merge(Env::prefixed("FPMA_"))
            .extract()
            .map_err(|e| crate::error::FpmaError::configuration(format!("failed to load config: {e}")))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api_request_timeout_secs)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.api_connection_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn exchange_rate_ttl(&self) -> Duration {
        Duration::from_secs(self.exchange_rate_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = AppConfig::default();
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.api_request_timeout_secs, 30);
        assert_eq!(config.api_connection_timeout_secs, 10);
        assert_eq!(config.api_retry_max_attempts, 3);
        assert_eq!(config.api_retry_backoff_factor, 1.5);
        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.exchange_rate_ttl_seconds, 86400);
        assert_eq!(config.ingest_batch_size, 1000);
        assert!(config.database.run_migrations);
    }

    #[test]
    fn loads_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fpma.toml");
        std::fs::write(&path, "default_currency = \"EUR\"\ncache_ttl_seconds = 120\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.cache_ttl_seconds, 120);
        assert_eq!(config.api_request_timeout_secs, 30);
    }
}
