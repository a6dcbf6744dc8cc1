//! Layered application configuration.
//!
//! Sources, lowest priority first:
//! 1. defaults set in code
//! 2. `config/<environment>.toml` (optional)
//! 3. `RECEIPTDESK__*` environment variables (`RECEIPTDESK__SERVER__PORT=8080`)

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use receiptdesk_observability::LogFormat;

pub const ENV_PREFIX: &str = "RECEIPTDESK";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Current environment (development, production).
    pub environment: String,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sync: SyncConfig,
    /// Start from the demo dataset instead of an empty store.
    pub seed_demo_data: bool,
    /// Activity journal entries kept in memory.
    pub journal_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Fallback filter when `RUST_LOG` is unset.
    pub filter: String,
}

/// Remote table store. Sync is disabled while `url` is unset.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl SyncConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var(format!("{ENV_PREFIX}__ENVIRONMENT"))
            .unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.format", "json")?
            .set_default("logging.filter", "info")?
            .set_default("sync.timeout_secs", 10)?
            .set_default("seed_demo_data", true)?
            .set_default("journal_capacity", 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_without_any_source() {
        let cfg: AppConfig = AppConfig::builder("test")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.environment, "test");
        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(!cfg.sync.is_enabled());
        assert_eq!(cfg.sync.timeout(), Duration::from_secs(10));
        assert!(cfg.seed_demo_data);
        assert_eq!(cfg.journal_capacity, 10_000);
    }

    #[test]
    fn overrides_layer_over_defaults() {
        let cfg: AppConfig = AppConfig::builder("test")
            .unwrap()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("logging.format", "pretty")
            .unwrap()
            .set_override("sync.url", "https://db.example.test")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
        assert!(cfg.sync.is_enabled());
    }
}
