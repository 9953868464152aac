//! Settlement pipeline: validation, ledger mutation, receipt emission.

pub mod receipt;
pub mod settlement;

pub use receipt::Receipt;
pub use settlement::{Settlement, SettlementEngine, SettlementError};
