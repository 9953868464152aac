//! Order: an in-flight buy/sell request and its fee arithmetic.

use crate::domain::{Decimal, Side, Symbol};
use serde::{Deserialize, Serialize};

/// Fee parameters applied to every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Platform fee as a fraction of the subtotal (default 1%).
    pub platform_fee_rate: Decimal,
    /// Flat network fee in USD (default 2.50).
    pub network_fee: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            platform_fee_rate: Decimal::from_str_canonical("0.01").expect("valid constant"),
            network_fee: Decimal::from_str_canonical("2.5").expect("valid constant"),
        }
    }
}

/// The in-flight user request. Not persisted until settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub symbol: Symbol,
    /// Positive asset quantity requested.
    pub requested_quantity: Decimal,
    /// Unit price the order was quoted at.
    pub quoted_unit_price: Decimal,
}

impl Order {
    pub fn new(
        side: Side,
        symbol: Symbol,
        requested_quantity: Decimal,
        quoted_unit_price: Decimal,
    ) -> Self {
        Order {
            side,
            symbol,
            requested_quantity,
            quoted_unit_price,
        }
    }

    /// Compute the fee breakdown for this order.
    ///
    /// Buys pay fees on top of the subtotal; sells have fees deducted from
    /// the proceeds. All amounts are rounded to cents.
    pub fn breakdown(&self, fees: &FeeSchedule) -> CostBreakdown {
        let subtotal = (self.requested_quantity * self.quoted_unit_price).round_currency();
        let platform_fee = (subtotal * fees.platform_fee_rate).round_currency();
        let network_fee = fees.network_fee.round_currency();
        let total = match self.side {
            Side::Buy => subtotal + platform_fee + network_fee,
            Side::Sell => subtotal - platform_fee - network_fee,
        };

        CostBreakdown {
            subtotal,
            platform_fee,
            network_fee,
            total,
        }
    }
}

/// Derived order amounts, all in USD rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub network_fee: Decimal,
    /// Buy: amount debited from the balance. Sell: amount credited.
    pub total: Decimal,
}

/// Per-order lifecycle.
///
/// Rejected, WriteFailed, ReceiptPersisted and ReceiptFailed are terminal;
/// nothing is retried automatically, the user must re-initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Draft,
    Quoted,
    Validating,
    Rejected,
    Settling,
    Settled,
    WriteFailed,
    ReceiptPersisted,
    ReceiptFailed,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Rejected
                | OrderState::WriteFailed
                | OrderState::ReceiptPersisted
                | OrderState::ReceiptFailed
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (Draft, Quoted)
                | (Quoted, Validating)
                | (Validating, Rejected)
                | (Validating, Settling)
                | (Settling, Settled)
                | (Settling, WriteFailed)
                | (Settled, ReceiptPersisted)
                | (Settled, ReceiptFailed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_buy_breakdown_adds_fees() {
        // 0.01 BTC at $60,000: subtotal 600, platform fee 6, network 2.50.
        let order = Order::new(Side::Buy, Symbol::new("BTC"), dec("0.01"), dec("60000"));
        let breakdown = order.breakdown(&FeeSchedule::default());

        assert_eq!(breakdown.subtotal, dec("600"));
        assert_eq!(breakdown.platform_fee, dec("6"));
        assert_eq!(breakdown.network_fee, dec("2.5"));
        assert_eq!(breakdown.total, dec("608.5"));
    }

    #[test]
    fn test_sell_breakdown_deducts_fees() {
        // 2 ETH at $3,000: subtotal 6000, platform fee 60, network 2.50.
        let order = Order::new(Side::Sell, Symbol::new("ETH"), dec("2"), dec("3000"));
        let breakdown = order.breakdown(&FeeSchedule::default());

        assert_eq!(breakdown.subtotal, dec("6000"));
        assert_eq!(breakdown.platform_fee, dec("60"));
        assert_eq!(breakdown.total, dec("5937.5"));
    }

    #[test]
    fn test_breakdown_rounds_to_cents() {
        let order = Order::new(Side::Buy, Symbol::new("DOGE"), dec("3"), dec("0.111111"));
        let breakdown = order.breakdown(&FeeSchedule::default());

        assert_eq!(breakdown.subtotal, dec("0.33"));
        // 1% of 0.33 is 0.0033, below half a cent.
        assert_eq!(breakdown.platform_fee, dec("0"));
        assert_eq!(breakdown.total, dec("2.83"));
    }

    #[test]
    fn test_state_machine_paths() {
        use OrderState::*;

        assert!(Draft.can_transition_to(Quoted));
        assert!(Quoted.can_transition_to(Validating));
        assert!(Validating.can_transition_to(Rejected));
        assert!(Validating.can_transition_to(Settling));
        assert!(Settling.can_transition_to(Settled));
        assert!(Settling.can_transition_to(WriteFailed));
        assert!(Settled.can_transition_to(ReceiptPersisted));
        assert!(Settled.can_transition_to(ReceiptFailed));

        assert!(!Draft.can_transition_to(Settled));
        assert!(!Rejected.can_transition_to(Quoted));
        assert!(!Settled.can_transition_to(Settling));
    }

    #[test]
    fn test_terminal_states() {
        use OrderState::*;
        for state in [Rejected, WriteFailed, ReceiptPersisted, ReceiptFailed] {
            assert!(state.is_terminal());
        }
        for state in [Draft, Quoted, Validating, Settling, Settled] {
            assert!(!state.is_terminal());
        }
    }
}
