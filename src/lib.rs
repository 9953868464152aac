pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod marketdata;
pub mod quote;

pub use config::Config;
pub use db::{init_db, HoldingMetadata, Repository};
pub use domain::{
    Account, CostBreakdown, Decimal, FeeSchedule, Holding, Order, OrderState, Quote, Side, Symbol,
    TransactionRecord, TxStatus, UserId,
};
pub use engine::{Receipt, Settlement, SettlementEngine, SettlementError};
pub use error::AppError;
pub use marketdata::{CoinGeckoSource, MarketData, MarketDataError, MockMarketData};
pub use quote::{LockedQuote, PriceStatus, QuoteService};
