pub mod accounts;
pub mod health;
pub mod holdings;
pub mod orders;
pub mod quotes;
pub mod receipts;
pub mod transactions;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::SettlementEngine;
use crate::quote::QuoteService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub engine: Arc<SettlementEngine>,
    pub quotes: Arc<QuoteService>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        engine: Arc<SettlementEngine>,
        quotes: Arc<QuoteService>,
        config: Config,
    ) -> Self {
        Self {
            repo,
            engine,
            quotes,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/:user_id", get(accounts::get_account))
        .route("/v1/accounts/:user_id/deposit", post(accounts::deposit))
        .route("/v1/accounts/:user_id/withdraw", post(accounts::withdraw))
        .route("/v1/quotes", get(quotes::get_quote))
        .route("/v1/quotes/check", get(quotes::check_price))
        .route("/v1/prices/:asset_id/history", get(quotes::get_price_history))
        .route("/v1/orders", post(orders::settle_order))
        .route("/v1/holdings", get(holdings::get_holdings))
        .route("/v1/transactions", get(transactions::get_transactions))
        .route(
            "/v1/transactions/export",
            get(transactions::export_transactions),
        )
        .route("/v1/receipts/:tx_id", get(receipts::get_receipt))
        .layer(cors)
        .with_state(state)
}
