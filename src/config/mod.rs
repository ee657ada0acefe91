//! Application configuration management

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::graphql::pagination::PageLimits;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// PostgreSQL URL of the indexed chain database
    pub database_url: String,

    /// Maximum pooled database connections
    pub database_max_connections: u32,

    /// Denom deposit totals are summed in
    pub chain_coin_denom: String,

    /// Page size used when a list query omits `first`
    pub default_page_size: i32,

    /// Largest `first` a list query may ask for
    pub max_page_size: i32,

    /// How long a loader waits after the first key of a batch before fetching
    pub loader_batch_delay: Duration,

    /// Slashing window used to compute validator uptime
    pub signed_blocks_window: i64,
}

/// Upper bound on the loader delay; longer waits only add latency
const MAX_LOADER_DELAY_MS: u64 = 50;

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required")?;

        let loader_delay_ms: u64 = parse_var("LOADER_BATCH_DELAY_MS", 1)?;

        let config = Self {
            port: parse_var("PORT", 3001)?,
            database_url,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            chain_coin_denom: env::var("CHAIN_COIN_DENOM")
                .unwrap_or_else(|_| "nanolike".to_string()),
            default_page_size: parse_var("DEFAULT_PAGE_SIZE", 25)?,
            max_page_size: parse_var("MAX_PAGE_SIZE", 100)?,
            loader_batch_delay: Duration::from_millis(loader_delay_ms),
            signed_blocks_window: parse_var("SIGNED_BLOCKS_WINDOW", 10_000)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size < 1 {
            bail!("DEFAULT_PAGE_SIZE must be at least 1");
        }
        if self.default_page_size > self.max_page_size {
            bail!(
                "DEFAULT_PAGE_SIZE ({}) must not exceed MAX_PAGE_SIZE ({})",
                self.default_page_size,
                self.max_page_size
            );
        }
        if self.loader_batch_delay > Duration::from_millis(MAX_LOADER_DELAY_MS) {
            bail!("LOADER_BATCH_DELAY_MS must not exceed {}", MAX_LOADER_DELAY_MS);
        }
        if self.signed_blocks_window < 1 {
            bail!("SIGNED_BLOCKS_WINDOW must be at least 1");
        }
        if self.database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_size: self.default_page_size,
            max_size: self.max_page_size,
        }
    }

    /// Defaults with the given database URL, for tests and tooling
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            port: 3001,
            database_url: database_url.into(),
            database_max_connections: 10,
            chain_coin_denom: "nanolike".to_string(),
            default_page_size: 25,
            max_page_size: 100,
            loader_batch_delay: Duration::from_millis(1),
            signed_blocks_window: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::with_database_url("postgres://localhost/likedao");
        assert_ok!(config.validate());
        assert_eq!(config.page_limits(), PageLimits::default());
    }

    #[test]
    fn test_default_page_size_above_max_is_rejected() {
        let mut config = Config::with_database_url("postgres://localhost/likedao");
        config.default_page_size = 200;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_PAGE_SIZE"));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let mut config = Config::with_database_url("postgres://localhost/likedao");
        config.default_page_size = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_loader_delay_is_bounded() {
        let mut config = Config::with_database_url("postgres://localhost/likedao");
        config.loader_batch_delay = Duration::from_secs(1);
        assert_err!(config.validate());
    }
}
