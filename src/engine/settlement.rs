//! The settlement engine: validate an order, mutate the ledger, emit the
//! transaction record.
//!
//! Stages run strictly in sequence. Validation failures leave the ledger
//! untouched. The two ledger writes happen atomically inside the
//! repository's settlement transaction. A receipt-persist failure after the
//! ledger has committed is deliberately NOT rolled back: the money has moved
//! and only the audit record is missing, which callers must surface as a
//! distinct warning rather than a generic failure.

use crate::db::{HoldingMetadata, LedgerError, Repository};
use crate::domain::{
    CostBreakdown, Decimal, FeeSchedule, Order, OrderState, Quote, TransactionRecord, UserId,
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Reasons an order does not settle. Validation variants are recoverable:
/// the order returns to draft with no state mutated. WriteFailed is fatal to
/// the order; the user must re-initiate from scratch.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("requested quantity must be a positive amount")]
    InvalidAmount,
    #[error("quote expired; re-acquire a price before settling")]
    QuoteExpired,
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },
    #[error("insufficient holding: have {available}, requested {requested}")]
    InsufficientHolding {
        available: Decimal,
        requested: Decimal,
    },
    #[error("settlement write failed: {0}")]
    WriteFailed(String),
}

impl SettlementError {
    /// Stable machine-readable code, one per failure condition.
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::InvalidAmount => "invalid_amount",
            SettlementError::QuoteExpired => "quote_expired",
            SettlementError::InsufficientBalance { .. } => "insufficient_balance",
            SettlementError::InsufficientHolding { .. } => "insufficient_holding",
            SettlementError::WriteFailed(_) => "settlement_write_failed",
        }
    }
}

impl From<LedgerError> for SettlementError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                available,
                required,
            } => SettlementError::InsufficientBalance {
                available,
                required,
            },
            LedgerError::InsufficientHolding {
                available,
                requested,
            } => SettlementError::InsufficientHolding {
                available,
                requested,
            },
            LedgerError::AccountNotFound(user) => {
                SettlementError::WriteFailed(format!("account not found: {}", user))
            }
            LedgerError::Storage(e) => SettlementError::WriteFailed(e.to_string()),
        }
    }
}

/// Outcome of a settled order.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub record: TransactionRecord,
    pub breakdown: CostBreakdown,
    pub new_balance: Decimal,
    pub new_quantity: Decimal,
    pub holding_deleted: bool,
    /// False when the ledger committed but the audit record did not persist.
    pub receipt_persisted: bool,
    /// Terminal state: ReceiptPersisted or ReceiptFailed.
    pub state: OrderState,
}

/// Executes the settlement pipeline against the ledger repository.
pub struct SettlementEngine {
    repo: Arc<Repository>,
    fees: FeeSchedule,
    busy_retries: u32,
}

impl SettlementEngine {
    pub fn new(repo: Arc<Repository>, fees: FeeSchedule, busy_retries: u32) -> Self {
        Self {
            repo,
            fees,
            busy_retries,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Validate the order without touching the ledger.
    ///
    /// Only the checks that need no authoritative read happen here; balance
    /// and holding sufficiency are re-checked inside the settlement
    /// transaction against freshly read state.
    pub fn validate(&self, order: &Order, quote: &Quote) -> Result<(), SettlementError> {
        if !order.requested_quantity.is_positive() {
            return Err(SettlementError::InvalidAmount);
        }
        if quote.is_expired(Utc::now()) {
            return Err(SettlementError::QuoteExpired);
        }
        Ok(())
    }

    /// Run the full pipeline for one order.
    pub async fn settle(
        &self,
        user_id: &UserId,
        order: &Order,
        quote: &Quote,
        metadata: &HoldingMetadata,
    ) -> Result<Settlement, SettlementError> {
        self.validate(order, quote)?;

        let breakdown = order.breakdown(&self.fees);
        info!(
            "settling {} {} {} at {} (total {})",
            order.side, order.requested_quantity, order.symbol, order.quoted_unit_price,
            breakdown.total
        );

        let update = self
            .repo
            .apply_settlement(
                user_id,
                order.side,
                &order.symbol,
                order.requested_quantity,
                breakdown.total,
                metadata,
                self.busy_retries,
            )
            .await?;

        let record = TransactionRecord::from_settled(
            user_id.clone(),
            order,
            &breakdown,
            metadata.display_name.clone(),
            Utc::now(),
        );

        // The ledger is committed at this point; a failed insert loses the
        // audit record, not the money.
        let (receipt_persisted, state) = match self.repo.insert_transaction(&record).await {
            Ok(()) => (true, OrderState::ReceiptPersisted),
            Err(e) => {
                warn!(
                    "receipt persist failed for {} after ledger commit: {}",
                    record.id, e
                );
                (false, OrderState::ReceiptFailed)
            }
        };

        Ok(Settlement {
            record,
            breakdown,
            new_balance: update.new_balance,
            new_quantity: update.new_quantity,
            holding_deleted: update.holding_deleted,
            receipt_persisted,
            state,
        })
    }
}
