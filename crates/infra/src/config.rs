//! Configuration loading from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `JWT_SECRET` | `dev-secret` (logged as insecure) |
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent stores are on |
//! | `EXCHANGE_RATE_URL` | dolarsi `valoresprincipales` endpoint |
//! | `EXCHANGE_RATE_ENTRY` | `Dolar Blue` |
//! | `EXCHANGE_RATE_TIMEOUT_SECS` | `10` |
//! | `EXCHANGE_RATE_RETRIES` | `3` |
//! | `EXCHANGE_RATE_BACKOFF_MS` | `300` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryConfig;

pub const DEFAULT_RATE_URL: &str = "https://www.dolarsi.com/api/api.php?type=valoresprincipales";
pub const DEFAULT_RATE_ENTRY: &str = "Dolar Blue";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateConfig {
    pub url: String,
    /// `nombre` of the payload entry to read.
    pub entry: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RATE_URL.to_string(),
            entry: DEFAULT_RATE_ENTRY.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub exchange_rate: ExchangeRateConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let storage = if parse_or(&lookup, "USE_PERSISTENT_STORES", false)? {
            let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        let defaults = ExchangeRateConfig::default();
        let exchange_rate = ExchangeRateConfig {
            url: lookup("EXCHANGE_RATE_URL").unwrap_or(defaults.url),
            entry: lookup("EXCHANGE_RATE_ENTRY").unwrap_or(defaults.entry),
            timeout: Duration::from_secs(parse_or(&lookup, "EXCHANGE_RATE_TIMEOUT_SECS", 10u64)?),
            retry: RetryConfig {
                max_retries: parse_or(
                    &lookup,
                    "EXCHANGE_RATE_RETRIES",
                    defaults.retry.max_retries,
                )?,
                initial_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "EXCHANGE_RATE_BACKOFF_MS",
                    300u64,
                )?),
                ..defaults.retry
            },
        };

        Ok(Self {
            jwt_secret,
            bind_addr,
            storage,
            exchange_rate,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
