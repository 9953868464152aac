use crate::domain::{Decimal, FeeSchedule};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub market_api_url: String,
    pub market_api_key: Option<String>,
    pub platform_fee_rate: Decimal,
    pub network_fee: Decimal,
    pub quote_validity_secs: u64,
    pub price_refresh_secs: u64,
    pub price_move_threshold: Decimal,
    pub settle_busy_retries: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let market_api_url = env_map
            .get("MARKET_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.coingecko.com/api/v3".to_string());

        let market_api_key = env_map.get("MARKET_API_KEY").cloned();

        let platform_fee_rate = parse_decimal(&env_map, "PLATFORM_FEE_RATE", "0.01")?;
        let network_fee = parse_decimal(&env_map, "NETWORK_FEE", "2.5")?;
        let price_move_threshold = parse_decimal(&env_map, "PRICE_MOVE_THRESHOLD", "0.5")?;

        let quote_validity_secs = parse_u64(&env_map, "QUOTE_VALIDITY_SECS", "60")?;
        let price_refresh_secs = parse_u64(&env_map, "PRICE_REFRESH_SECS", "10")?;

        let settle_busy_retries = env_map
            .get("SETTLE_BUSY_RETRIES")
            .map(|s| s.as_str())
            .unwrap_or("3")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SETTLE_BUSY_RETRIES".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            market_api_url,
            market_api_key,
            platform_fee_rate,
            network_fee,
            quote_validity_secs,
            price_refresh_secs,
            price_move_threshold,
            settle_busy_retries,
        })
    }

    /// The fee schedule applied to every order.
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            platform_fee_rate: self.platform_fee_rate,
            network_fee: self.network_fee,
        }
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string())
    })
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<u64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string()))
}
