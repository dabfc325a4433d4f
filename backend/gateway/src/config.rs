//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database holding the persisted ledger lists
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Simulated confirmation delay applied to every write
    pub chain_latency: Duration,
    /// Write the example requests when the database holds none
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite:./aid_ledger.db"),
            api_port: var("API_PORT", "3001")
                .parse()
                .map_err(|_| GatewayError::Config("Invalid API_PORT".to_string()))?,
            chain_latency: var("CHAIN_LATENCY_MS", "2000")
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| GatewayError::Config("Invalid CHAIN_LATENCY_MS".to_string()))?,
            seed_demo_data: parse_bool(&var("SEED_DEMO_DATA", "true"))
                .ok_or_else(|| GatewayError::Config("Invalid SEED_DEMO_DATA".to_string()))?,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
