//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{DonationError, Result};
use crate::types::Presets;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the foundation provider (e.g. http://localhost:3000/api)
    pub provider_url: String,
    /// Path to the SQLite database holding remembered preferences
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Suggested donation amounts, in display order
    pub presets: Presets,
    /// Key under which the preference mapping is stored
    pub preference_namespace: String,
    /// Minimum time the catalog stays in `loading`
    pub catalog_min_delay: Duration,
    /// Minimum time a payment submission takes to resolve
    pub payment_min_delay: Duration,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            provider_url: env_var("PROVIDER_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./donations.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3002".to_string())
                .parse()
                .map_err(|_| DonationError::Config("Invalid API_PORT".to_string()))?,
            presets: parse_presets(
                &env_var("PRESET_AMOUNTS").unwrap_or_else(|_| "10,20,50,100,500".to_string()),
            )?,
            preference_namespace: env_var("PREFERENCE_NAMESPACE")
                .unwrap_or_else(|_| "foundationData".to_string()),
            catalog_min_delay: Duration::from_millis(parse_u64("CATALOG_MIN_DELAY_MS", "0")?),
            payment_min_delay: Duration::from_millis(parse_u64("PAYMENT_MIN_DELAY_MS", "0")?),
            http_timeout: Duration::from_secs(parse_u64("HTTP_TIMEOUT_SECS", "30")?),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| DonationError::Config(format!("Missing env var: {key}")))
}

fn parse_u64(key: &str, default: &str) -> Result<u64> {
    env_var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| DonationError::Config(format!("Invalid {key}")))
}

/// Parse a comma-separated list such as `10,20,50` into [`Presets`].
pub fn parse_presets(raw: &str) -> Result<Presets> {
    let amounts = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| DonationError::Config(format!("Invalid preset amount: {s}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Presets::new(amounts)
        .ok_or_else(|| DonationError::Config("PRESET_AMOUNTS must not be empty".to_string()))
}
