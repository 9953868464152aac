//! Domain types for the simulated trading ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: UserId, Symbol, Side
//! - Account / Holding ledger records and the ephemeral Quote and Order
//! - TransactionRecord, the immutable audit entry per settlement

pub mod account;
pub mod decimal;
pub mod holding;
pub mod order;
pub mod primitives;
pub mod quote;
pub mod transaction;

pub use account::Account;
pub use decimal::Decimal;
pub use holding::Holding;
pub use order::{CostBreakdown, FeeSchedule, Order, OrderState};
pub use primitives::{Side, Symbol, UserId};
pub use quote::Quote;
pub use transaction::{TransactionRecord, TxStatus};
