//! Mock market-data source for testing without network calls.

use super::{MarketData, MarketDataError, PricePoint};
use crate::domain::Decimal;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock market-data source returning predefined prices.
///
/// Prices can be changed mid-test to simulate market movement, and the whole
/// provider can be switched into a failing or rate-limited mode.
#[derive(Debug, Default)]
pub struct MockMarketData {
    prices: Mutex<HashMap<String, Decimal>>,
    series: Mutex<HashMap<String, Vec<PricePoint>>>,
    failure: Mutex<Option<MarketDataError>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current price for an asset.
    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    /// Set the historical series for an asset.
    pub fn with_series(self, symbol: &str, series: Vec<PricePoint>) -> Self {
        self.series
            .lock()
            .expect("mock lock poisoned")
            .insert(symbol.to_string(), series);
        self
    }

    /// Change the current price after construction.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .expect("mock lock poisoned")
            .insert(symbol.to_string(), price);
    }

    /// Make every call fail with the given error until cleared.
    pub fn set_failure(&self, error: Option<MarketDataError>) {
        *self.failure.lock().expect("mock lock poisoned") = error;
    }

    fn check_failure(&self) -> Result<(), MarketDataError> {
        match &*self.failure.lock().expect("mock lock poisoned") {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketData for MockMarketData {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        self.check_failure()?;
        self.prices
            .lock()
            .expect("mock lock poisoned")
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketDataError::UnknownAsset(symbol.to_string()))
    }

    async fn price_series(
        &self,
        symbol: &str,
        _days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        self.check_failure()?;
        Ok(self
            .series
            .lock()
            .expect("mock lock poisoned")
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_mock_returns_configured_price() {
        let mock = MockMarketData::new().with_price("bitcoin", dec("60000"));
        let price = mock.current_price("bitcoin").await.unwrap();
        assert_eq!(price, dec("60000"));
    }

    #[tokio::test]
    async fn test_mock_unknown_asset() {
        let mock = MockMarketData::new();
        let err = mock.current_price("bitcoin").await.unwrap_err();
        assert!(matches!(err, MarketDataError::UnknownAsset(_)));
    }

    #[tokio::test]
    async fn test_mock_failure_mode() {
        let mock = MockMarketData::new().with_price("bitcoin", dec("60000"));
        mock.set_failure(Some(MarketDataError::NetworkError("down".to_string())));
        assert!(mock.current_price("bitcoin").await.is_err());

        mock.set_failure(None);
        assert!(mock.current_price("bitcoin").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_price_can_move() {
        let mock = MockMarketData::new().with_price("bitcoin", dec("100"));
        mock.set_price("bitcoin", dec("101"));
        assert_eq!(mock.current_price("bitcoin").await.unwrap(), dec("101"));
    }

    #[tokio::test]
    async fn test_mock_series() {
        let mock = MockMarketData::new().with_series(
            "bitcoin",
            vec![PricePoint {
                time_ms: 1000,
                price: dec("99"),
            }],
        );
        let series = mock.price_series("bitcoin", 1).await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].price, dec("99"));
    }
}
