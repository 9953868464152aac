use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::accounts::parse_amount;
use crate::api::AppState;
use crate::domain::Symbol;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    /// Provider asset identifier, e.g. "bitcoin".
    pub asset_id: String,
    /// Ticker symbol for the quote, e.g. "BTC".
    pub symbol: String,
    /// "locked" (default) or "live".
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub symbol: String,
    pub unit_price: String,
    pub as_of: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

pub async fn get_quote(
    Query(params): Query<QuoteParams>,
    State(state): State<AppState>,
) -> Result<Json<QuoteResponse>, AppError> {
    let symbol = parse_symbol(&params.symbol)?;
    let quote = match params.mode.as_deref() {
        None | Some("locked") => state.quotes.locked_quote(&params.asset_id, symbol).await?,
        Some("live") => state.quotes.live_quote(&params.asset_id, symbol).await?,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown quote mode: {}",
                other
            )))
        }
    };

    Ok(Json(QuoteResponse {
        symbol: quote.symbol.to_string(),
        unit_price: quote.unit_price.to_canonical_string(),
        as_of: quote.as_of.to_rfc3339(),
        validity_secs: quote.validity_secs,
        expires_at: quote.expires_at().map(|t| t.to_rfc3339()),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCheckParams {
    pub asset_id: String,
    /// The locked unit price the client is holding.
    pub locked_price: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCheckResponse {
    pub live_price: String,
    pub moved: bool,
}

/// One-shot divergence check for clients holding a locked quote.
pub async fn check_price(
    Query(params): Query<PriceCheckParams>,
    State(state): State<AppState>,
) -> Result<Json<PriceCheckResponse>, AppError> {
    let locked_price = parse_amount(&params.locked_price)?;
    let status = state
        .quotes
        .price_check(&params.asset_id, locked_price)
        .await?;

    Ok(Json(PriceCheckResponse {
        live_price: status.live_price.to_canonical_string(),
        moved: status.moved,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePointDto {
    pub time_ms: i64,
    pub price: String,
}

pub async fn get_price_history(
    Path(asset_id): Path<String>,
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PricePointDto>>, AppError> {
    let days = params.days.unwrap_or(7);
    if days == 0 || days > 365 {
        return Err(AppError::BadRequest(
            "days must be between 1 and 365".into(),
        ));
    }

    let points = state.quotes.price_series(&asset_id, days).await?;
    Ok(Json(
        points
            .into_iter()
            .map(|p| PricePointDto {
                time_ms: p.time_ms,
                price: p.price.to_canonical_string(),
            })
            .collect(),
    ))
}

pub(crate) fn parse_symbol(raw: &str) -> Result<Symbol, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 16 {
        return Err(AppError::BadRequest("Invalid symbol".into()));
    }
    Ok(Symbol::new(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_normalizes() {
        assert_eq!(parse_symbol("btc").unwrap().to_string(), "BTC");
        assert!(parse_symbol("").is_err());
        assert!(parse_symbol("TOOLONGSYMBOLNAME1").is_err());
    }
}
