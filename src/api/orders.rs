use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::accounts::{parse_amount, parse_user_id};
use crate::api::quotes::parse_symbol;
use crate::api::AppState;
use crate::db::HoldingMetadata;
use crate::domain::{Order, Quote, Side};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: String,
    /// "buy" or "sell".
    pub side: String,
    pub symbol: String,
    /// Provider asset identifier, required when no quote is supplied.
    pub asset_id: Option<String>,
    pub quantity: String,
    /// A quote the client already holds. Absent means settle at the live
    /// price read now.
    pub quote: Option<QuoteDto>,
    pub display_name: Option<String>,
    pub icon_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDto {
    pub unit_price: String,
    pub as_of: DateTime<Utc>,
    pub validity_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub transaction_id: String,
    pub side: String,
    pub symbol: String,
    pub quantity: String,
    pub unit_price: String,
    pub subtotal: String,
    pub platform_fee: String,
    pub network_fee: String,
    pub total: String,
    pub new_balance: String,
    pub new_quantity: String,
    pub holding_deleted: bool,
    pub receipt_persisted: bool,
    pub settled_at: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Settle one order end to end. Validation failures leave the ledger
/// untouched and come back as 422 with a specific error code.
pub async fn settle_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let user_id = parse_user_id(&req.user_id)?;
    let side = Side::parse(&req.side)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown side: {}", req.side)))?;
    let symbol = parse_symbol(&req.symbol)?;
    let quantity = parse_amount(&req.quantity)?;

    let quote = match req.quote {
        Some(dto) => {
            let unit_price = parse_amount(&dto.unit_price)?;
            match dto.validity_secs {
                Some(secs) => Quote::locked(symbol.clone(), unit_price, dto.as_of, secs),
                None => Quote::live(symbol.clone(), unit_price, dto.as_of),
            }
        }
        None => {
            let asset_id = req.asset_id.as_deref().ok_or_else(|| {
                AppError::BadRequest("assetId is required when no quote is supplied".into())
            })?;
            state.quotes.live_quote(asset_id, symbol.clone()).await?
        }
    };

    let order = Order::new(side, symbol, quantity, quote.unit_price);
    let metadata = HoldingMetadata {
        display_name: req.display_name,
        icon_ref: req.icon_ref,
    };

    let settlement = state
        .engine
        .settle(&user_id, &order, &quote, &metadata)
        .await?;

    let warning = if settlement.receipt_persisted {
        None
    } else {
        Some("settled, but the transaction record could not be saved".to_string())
    };

    let record = &settlement.record;
    Ok(Json(OrderResponse {
        transaction_id: record.id.clone(),
        side: record.side.to_string(),
        symbol: record.symbol.to_string(),
        quantity: record.quantity.to_canonical_string(),
        unit_price: record.unit_price.to_canonical_string(),
        subtotal: settlement.breakdown.subtotal.to_canonical_string(),
        platform_fee: settlement.breakdown.platform_fee.to_canonical_string(),
        network_fee: settlement.breakdown.network_fee.to_canonical_string(),
        total: settlement.breakdown.total.to_canonical_string(),
        new_balance: settlement.new_balance.to_canonical_string(),
        new_quantity: settlement.new_quantity.to_canonical_string(),
        holding_deleted: settlement.holding_deleted,
        receipt_persisted: settlement.receipt_persisted,
        settled_at: record.settled_at.to_rfc3339(),
        status: record.status.to_string(),
        warning,
    }))
}

