//! Persistence: SQLite schema, migrations, and the ledger repository.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{HoldingMetadata, LedgerError, Repository, SettlementUpdate};
