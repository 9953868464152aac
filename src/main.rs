use papertrade::api;
use papertrade::marketdata::{CoinGeckoSource, MarketData};
use papertrade::quote::QuoteService;
use papertrade::{init_db, Config, Repository, SettlementEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let market: Arc<dyn MarketData> = Arc::new(CoinGeckoSource::new(
        config.market_api_url.clone(),
        config.market_api_key.clone(),
    ));
    let quotes = Arc::new(QuoteService::new(
        market,
        config.quote_validity_secs,
        Duration::from_secs(config.price_refresh_secs),
        config.price_move_threshold,
    ));
    let engine = Arc::new(SettlementEngine::new(
        Arc::clone(&repo),
        config.fee_schedule(),
        config.settle_busy_retries,
    ));

    // Create router
    let app = api::create_router(api::AppState::new(repo, engine, quotes, config));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
