//! TransactionRecord: immutable audit entry for a settled order.

use crate::domain::{CostBreakdown, Decimal, Order, Side, Symbol, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted transaction status. Only settled orders are written, so the
/// stored status is always Confirmed; pending/failed attempts never reach
/// the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// One record per settled order. Created exactly once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: UserId,
    pub side: Side,
    pub symbol: Symbol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub network_fee: Decimal,
    pub total: Decimal,
    pub settled_at: DateTime<Utc>,
    pub status: TxStatus,
}

impl TransactionRecord {
    /// Build the record for a just-settled order.
    pub fn from_settled(
        user_id: UserId,
        order: &Order,
        breakdown: &CostBreakdown,
        display_name: Option<String>,
        settled_at: DateTime<Utc>,
    ) -> Self {
        TransactionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            side: order.side,
            symbol: order.symbol.clone(),
            display_name,
            quantity: order.requested_quantity.round_quantity(),
            unit_price: order.quoted_unit_price,
            subtotal: breakdown.subtotal,
            platform_fee: breakdown.platform_fee,
            network_fee: breakdown.network_fee,
            total: breakdown.total,
            settled_at,
            status: TxStatus::Confirmed,
        }
    }
}
