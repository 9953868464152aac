//! Quote: an ephemeral price snapshot used to cost an order.

use crate::domain::{Decimal, Symbol};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A price snapshot for one asset. Never persisted.
///
/// A locked quote carries a validity window and must be re-acquired once it
/// expires; a live quote (read at confirmation time) has no window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    /// Positive price per unit in USD.
    pub unit_price: Decimal,
    pub as_of: DateTime<Utc>,
    /// Validity window in seconds; None for live quotes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_secs: Option<u64>,
}

impl Quote {
    /// A quote locked at `as_of` for `validity_secs` seconds.
    pub fn locked(
        symbol: Symbol,
        unit_price: Decimal,
        as_of: DateTime<Utc>,
        validity_secs: u64,
    ) -> Self {
        Quote {
            symbol,
            unit_price,
            as_of,
            validity_secs: Some(validity_secs),
        }
    }

    /// A live quote read at confirmation time, with no expiry.
    pub fn live(symbol: Symbol, unit_price: Decimal, as_of: DateTime<Utc>) -> Self {
        Quote {
            symbol,
            unit_price,
            as_of,
            validity_secs: None,
        }
    }

    /// When the quote stops being usable, if it has a window at all.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.validity_secs
            .map(|secs| self.as_of + Duration::seconds(secs as i64))
    }

    /// Whether the quote has expired as of `now`. Live quotes never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Whether a live price has moved away from this quote's locked price by
    /// more than an absolute threshold. The locked price itself never changes.
    pub fn diverged(&self, live_price: Decimal, threshold: Decimal) -> bool {
        (live_price - self.unit_price).abs() > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_at(price: &str, validity_secs: u64) -> Quote {
        Quote::locked(
            Symbol::new("BTC"),
            Decimal::from_str_canonical(price).unwrap(),
            Utc::now(),
            validity_secs,
        )
    }

    #[test]
    fn test_locked_quote_expires() {
        let quote = quote_at("100", 60);
        assert!(!quote.is_expired(quote.as_of + Duration::seconds(59)));
        assert!(!quote.is_expired(quote.as_of + Duration::seconds(60)));
        assert!(quote.is_expired(quote.as_of + Duration::seconds(61)));
    }

    #[test]
    fn test_live_quote_never_expires() {
        let quote = Quote::live(
            Symbol::new("ETH"),
            Decimal::from_str_canonical("3000").unwrap(),
            Utc::now(),
        );
        assert!(!quote.is_expired(quote.as_of + Duration::days(365)));
    }

    #[test]
    fn test_diverged_uses_absolute_threshold() {
        let quote = quote_at("100", 60);
        let threshold = Decimal::from_str_canonical("0.5").unwrap();

        assert!(!quote.diverged(Decimal::from_str_canonical("100.50").unwrap(), threshold));
        assert!(quote.diverged(Decimal::from_str_canonical("100.51").unwrap(), threshold));
        assert!(quote.diverged(Decimal::from_str_canonical("99.40").unwrap(), threshold));
    }
}
