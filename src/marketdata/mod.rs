//! Market-data abstraction for fetching current and historical prices.

use crate::domain::Decimal;
use async_trait::async_trait;
use std::fmt;

pub mod coingecko;
pub mod mock;

pub use coingecko::CoinGeckoSource;
pub use mock::MockMarketData;

/// A point in a historical price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    /// Milliseconds since Unix epoch.
    pub time_ms: i64,
    pub price: Decimal,
}

/// Market-data provider trait.
///
/// Implementations must handle retry/backoff and rate limiting; outages
/// surface as errors and make quote acquisition fail.
#[async_trait]
pub trait MarketData: Send + Sync + fmt::Debug {
    /// Fetch the current USD price for an asset.
    ///
    /// # Arguments
    /// * `symbol` - Provider asset identifier (e.g. "bitcoin")
    async fn current_price(&self, symbol: &str) -> Result<Decimal, MarketDataError>;

    /// Fetch a historical price series for an asset.
    ///
    /// # Arguments
    /// * `symbol` - Provider asset identifier
    /// * `days` - Lookback window in days
    ///
    /// # Returns
    /// Price points ordered by ascending time.
    async fn price_series(&self, symbol: &str, days: u32)
        -> Result<Vec<PricePoint>, MarketDataError>;
}

/// Error type for market-data operations.
#[derive(Debug, Clone)]
pub enum MarketDataError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Provider has no price for the requested asset
    UnknownAsset(String),
}

impl fmt::Display for MarketDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketDataError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            MarketDataError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            MarketDataError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            MarketDataError::RateLimited => write!(f, "Rate limited"),
            MarketDataError::UnknownAsset(symbol) => write!(f, "Unknown asset: {}", symbol),
        }
    }
}

impl std::error::Error for MarketDataError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marketdata_error_display() {
        let err = MarketDataError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = MarketDataError::HttpError {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 503: Service unavailable");

        let err = MarketDataError::RateLimited;
        assert_eq!(err.to_string(), "Rate limited");

        let err = MarketDataError::UnknownAsset("wat".to_string());
        assert_eq!(err.to_string(), "Unknown asset: wat");
    }
}
