use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use papertrade::api;
use papertrade::db::init_db;
use papertrade::domain::{Decimal, Holding, Side, Symbol, TransactionRecord, TxStatus, UserId};
use papertrade::marketdata::MockMarketData;
use papertrade::quote::QuoteService;
use papertrade::{Config, Repository, SettlementEngine};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    _temp: TempDir,
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        market_api_url: "http://example.invalid".to_string(),
        market_api_key: None,
        platform_fee_rate: dec("0.01"),
        network_fee: dec("2.5"),
        quote_validity_secs: 60,
        price_refresh_secs: 10,
        price_move_threshold: dec("0.5"),
        settle_busy_retries: 3,
    };
    let quotes = Arc::new(QuoteService::new(
        Arc::new(MockMarketData::new()),
        config.quote_validity_secs,
        std::time::Duration::from_secs(config.price_refresh_secs),
        config.price_move_threshold,
    ));
    let engine = Arc::new(SettlementEngine::new(
        repo.clone(),
        config.fee_schedule(),
        config.settle_busy_retries,
    ));
    let state = api::AppState::new(repo.clone(), engine, quotes, config);
    let app = api::create_router(state);

    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

async fn get_raw(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .map(|h| h.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, content_type, body)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _ct, body) = get_raw(app, uri).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn record(user: &str, id: &str, symbol: &str, settled_ms: i64) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        user_id: UserId::new(user.to_string()),
        side: Side::Buy,
        symbol: Symbol::new(symbol),
        display_name: None,
        quantity: dec("0.01"),
        unit_price: dec("60000"),
        subtotal: dec("600"),
        platform_fee: dec("6"),
        network_fee: dec("2.5"),
        total: dec("608.5"),
        settled_at: DateTime::<Utc>::from_timestamp_millis(settled_ms).unwrap(),
        status: TxStatus::Confirmed,
    }
}

#[tokio::test]
async fn test_transactions_newest_first() {
    let test_app = setup_test_app().await;
    test_app
        .repo
        .create_account(&UserId::new("u-1".to_string()))
        .await
        .unwrap();
    for (id, ms) in [("tx-a", 1_000), ("tx-b", 3_000), ("tx-c", 2_000)] {
        test_app
            .repo
            .insert_transaction(&record("u-1", id, "BTC", ms))
            .await
            .unwrap();
    }

    let (status, json) = get_json(test_app.app, "/v1/transactions?userId=u-1").await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["tx-b", "tx-c", "tx-a"]);
}

#[tokio::test]
async fn test_transactions_limit() {
    let test_app = setup_test_app().await;
    test_app
        .repo
        .create_account(&UserId::new("u-1".to_string()))
        .await
        .unwrap();
    for i in 0..5 {
        test_app
            .repo
            .insert_transaction(&record("u-1", &format!("tx-{}", i), "BTC", i * 1_000))
            .await
            .unwrap();
    }

    let (_status, json) = get_json(test_app.app, "/v1/transactions?userId=u-1&limit=2").await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["id"], "tx-4");
}

#[tokio::test]
async fn test_transactions_scoped_per_user() {
    let test_app = setup_test_app().await;
    for user in ["u-1", "u-2"] {
        test_app
            .repo
            .create_account(&UserId::new(user.to_string()))
            .await
            .unwrap();
    }
    test_app
        .repo
        .insert_transaction(&record("u-1", "tx-mine", "BTC", 1_000))
        .await
        .unwrap();
    test_app
        .repo
        .insert_transaction(&record("u-2", "tx-theirs", "ETH", 2_000))
        .await
        .unwrap();

    let (_status, json) = get_json(test_app.app, "/v1/transactions?userId=u-1").await;
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], "tx-mine");
}

#[tokio::test]
async fn test_export_is_csv_download() {
    let test_app = setup_test_app().await;
    test_app
        .repo
        .create_account(&UserId::new("u-1".to_string()))
        .await
        .unwrap();
    test_app
        .repo
        .insert_transaction(&record("u-1", "tx-a", "BTC", 1_000))
        .await
        .unwrap();

    let (status, content_type, body) =
        get_raw(test_app.app, "/v1/transactions/export?userId=u-1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/csv"));

    let csv = String::from_utf8(body).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,settledAt,side,symbol,quantity,unitPrice,subtotal,platformFee,networkFee,total,status"
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("tx-a,"));
    assert!(row.ends_with(",confirmed"));
}

#[tokio::test]
async fn test_export_empty_history_is_header_only() {
    let test_app = setup_test_app().await;
    let (status, _ct, body) = get_raw(test_app.app, "/v1/transactions/export?userId=u-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn test_holdings_listing_ordered_by_symbol() {
    let test_app = setup_test_app().await;
    let user = UserId::new("u-1".to_string());
    test_app.repo.create_account(&user).await.unwrap();
    test_app
        .repo
        .set_holding(
            &user,
            &Holding::new(Symbol::new("ETH"), dec("2")).with_metadata(
                Some("Ethereum".to_string()),
                None,
            ),
        )
        .await
        .unwrap();
    test_app
        .repo
        .set_holding(&user, &Holding::new(Symbol::new("BTC"), dec("0.5")))
        .await
        .unwrap();

    let (status, json) = get_json(test_app.app, "/v1/holdings?userId=u-1").await;
    assert_eq!(status, StatusCode::OK);

    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["symbol"], "BTC");
    assert_eq!(list[0]["quantity"], "0.5");
    assert_eq!(list[1]["symbol"], "ETH");
    assert_eq!(list[1]["displayName"], "Ethereum");
    assert!(list[1].get("iconRef").is_none());
}

#[tokio::test]
async fn test_holdings_empty_for_unknown_user() {
    let test_app = setup_test_app().await;
    let (status, json) = get_json(test_app.app, "/v1/holdings?userId=nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 0);
}
