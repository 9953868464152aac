//! CoinGecko API client implementation.

use super::{MarketData, MarketDataError, PricePoint};
use crate::domain::Decimal;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use rust_decimal::Decimal as RustDecimal;
use std::time::Duration;
use tracing::debug;

/// Market-data source backed by the public CoinGecko API.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    /// Create a new CoinGecko source.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create with the default public API URL.
    pub fn default_url(api_key: Option<String>) -> Self {
        Self::new("https://api.coingecko.com/api/v3".to_string(), api_key)
    }

    async fn get_json(&self, path_and_query: &str) -> Result<serde_json::Value, MarketDataError> {
        let separator = if path_and_query.contains('?') { '&' } else { '?' };
        let url = match &self.api_key {
            Some(key) => format!(
                "{}{}{}x_cg_demo_api_key={}",
                self.base_url, path_and_query, separator, key
            ),
            None => format!("{}{}", self.base_url, path_and_query),
        };

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(MarketDataError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(MarketDataError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(MarketDataError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(MarketDataError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(MarketDataError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl MarketData for CoinGeckoSource {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        debug!("Fetching current price for {}", symbol);

        let response = self
            .get_json(&format!("/simple/price?ids={}&vs_currencies=usd", symbol))
            .await?;

        let price = response
            .get(symbol)
            .and_then(|v| v.get("usd"))
            .ok_or_else(|| MarketDataError::UnknownAsset(symbol.to_string()))?;

        parse_price(price)
    }

    async fn price_series(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        debug!("Fetching {}-day price series for {}", days, symbol);

        let response = self
            .get_json(&format!(
                "/coins/{}/market_chart?vs_currency=usd&days={}",
                symbol, days
            ))
            .await?;

        let prices = response
            .get("prices")
            .and_then(|v| v.as_array())
            .ok_or_else(|| MarketDataError::ParseError("Missing prices array".to_string()))?;

        let mut series = Vec::with_capacity(prices.len());
        for entry in prices {
            let pair = entry
                .as_array()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| MarketDataError::ParseError("Malformed price entry".to_string()))?;
            let time_ms = pair[0]
                .as_f64()
                .ok_or_else(|| MarketDataError::ParseError("Missing timestamp".to_string()))?
                as i64;
            let price = parse_price(&pair[1])?;
            series.push(PricePoint { time_ms, price });
        }

        Ok(series)
    }
}

fn parse_price(value: &serde_json::Value) -> Result<Decimal, MarketDataError> {
    let price = value
        .as_f64()
        .and_then(RustDecimal::from_f64_retain)
        .map(Decimal::new)
        .ok_or_else(|| MarketDataError::ParseError(format!("Invalid price: {}", value)))?;

    if !price.is_positive() {
        return Err(MarketDataError::ParseError(format!(
            "Non-positive price: {}",
            price
        )));
    }
    Ok(price)
}
