//! Quote acquisition: live reads and locked quotes with a price monitor.
//!
//! Two strategies coexist. A live quote reads the provider price at
//! confirmation time with no expiry. A locked quote fixes the price when the
//! user initiates the order, carries a validity window, and runs a background
//! poll that flags divergence of the live price from the locked price. The
//! locked price used for settlement never changes; only the warning does.

use crate::domain::{Decimal, Quote, Symbol};
use crate::marketdata::{MarketData, MarketDataError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Error)]
pub enum QuoteError {
    /// The market-data provider could not supply a price; the order cannot
    /// proceed.
    #[error("quote unavailable: {0}")]
    Unavailable(#[from] MarketDataError),
}

/// Live view of the market relative to a locked quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceStatus {
    pub live_price: Decimal,
    /// True when the live price diverges from the locked price by more than
    /// the configured absolute threshold.
    pub moved: bool,
}

/// A locked quote plus its background price monitor.
///
/// Dropping this aborts the monitor task, so the periodic poll is scoped to
/// the lifetime of the in-flight order.
pub struct LockedQuote {
    pub quote: Quote,
    status: watch::Receiver<PriceStatus>,
    monitor: JoinHandle<()>,
}

impl LockedQuote {
    /// Latest observation from the background poll.
    pub fn price_status(&self) -> PriceStatus {
        *self.status.borrow()
    }
}

impl Drop for LockedQuote {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

/// Acquires quotes from a market-data provider.
#[derive(Clone)]
pub struct QuoteService {
    market: Arc<dyn MarketData>,
    validity_secs: u64,
    refresh_interval: Duration,
    move_threshold: Decimal,
}

impl QuoteService {
    pub fn new(
        market: Arc<dyn MarketData>,
        validity_secs: u64,
        refresh_interval: Duration,
        move_threshold: Decimal,
    ) -> Self {
        Self {
            market,
            validity_secs,
            refresh_interval,
            move_threshold,
        }
    }

    /// Read the live price right now. No lock, no expiry.
    pub async fn live_quote(&self, asset_id: &str, symbol: Symbol) -> Result<Quote, QuoteError> {
        let price = self.market.current_price(asset_id).await?;
        Ok(Quote::live(symbol, price, Utc::now()))
    }

    /// Lock the current price for the configured validity window without
    /// starting a monitor. Polling callers pair this with
    /// [`QuoteService::price_check`].
    pub async fn locked_quote(&self, asset_id: &str, symbol: Symbol) -> Result<Quote, QuoteError> {
        let price = self.market.current_price(asset_id).await?;
        Ok(Quote::locked(symbol, price, Utc::now(), self.validity_secs))
    }

    /// Historical price series for charting, passed through to the provider.
    pub async fn price_series(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<crate::marketdata::PricePoint>, QuoteError> {
        Ok(self.market.price_series(asset_id, days).await?)
    }

    /// One-shot divergence check of the live price against a locked price,
    /// for callers that poll instead of holding a [`LockedQuote`].
    pub async fn price_check(
        &self,
        asset_id: &str,
        locked_price: Decimal,
    ) -> Result<PriceStatus, QuoteError> {
        let live = self.market.current_price(asset_id).await?;
        Ok(observe(locked_price, live, self.move_threshold))
    }

    /// Lock the current price for the configured validity window and start
    /// the background price monitor.
    pub async fn lock_quote(
        &self,
        asset_id: &str,
        symbol: Symbol,
    ) -> Result<LockedQuote, QuoteError> {
        let price = self.market.current_price(asset_id).await?;
        let quote = Quote::locked(symbol, price, Utc::now(), self.validity_secs);

        let (tx, rx) = watch::channel(PriceStatus {
            live_price: price,
            moved: false,
        });

        let market = Arc::clone(&self.market);
        let locked_price = quote.unit_price;
        let threshold = self.move_threshold;
        let asset = asset_id.to_string();
        let refresh = self.refresh_interval;

        let monitor = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                match market.current_price(&asset).await {
                    Ok(live) => {
                        let status = observe(locked_price, live, threshold);
                        if tx.send(status).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // Transient provider failures keep the last status.
                        debug!("price refresh for {} failed: {}", asset, e);
                    }
                }
            }
        });

        Ok(LockedQuote {
            quote,
            status: rx,
            monitor,
        })
    }
}

/// Compare a live price against the locked price.
fn observe(locked_price: Decimal, live_price: Decimal, threshold: Decimal) -> PriceStatus {
    PriceStatus {
        live_price,
        moved: (live_price - locked_price).abs() > threshold,
    }
}
