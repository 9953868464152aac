use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::accounts::parse_user_id;
use crate::api::AppState;
use crate::domain::TransactionRecord;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsParams {
    pub user_id: String,
    /// Cap on the number of records returned, newest first.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub side: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub quantity: String,
    pub unit_price: String,
    pub subtotal: String,
    pub platform_fee: String,
    pub network_fee: String,
    pub total: String,
    pub settled_at: String,
    pub status: String,
}

impl From<TransactionRecord> for TransactionDto {
    fn from(r: TransactionRecord) -> Self {
        TransactionDto {
            id: r.id,
            side: r.side.to_string(),
            symbol: r.symbol.to_string(),
            display_name: r.display_name,
            quantity: r.quantity.to_canonical_string(),
            unit_price: r.unit_price.to_canonical_string(),
            subtotal: r.subtotal.to_canonical_string(),
            platform_fee: r.platform_fee.to_canonical_string(),
            network_fee: r.network_fee.to_canonical_string(),
            total: r.total.to_canonical_string(),
            settled_at: r.settled_at.to_rfc3339(),
            status: r.status.to_string(),
        }
    }
}

/// Transaction history for one account, newest first.
pub async fn get_transactions(
    Query(params): Query<TransactionsParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionDto>>, AppError> {
    let user_id = parse_user_id(&params.user_id)?;
    let mut records = state.repo.list_transactions(&user_id).await?;
    if let Some(limit) = params.limit {
        records.truncate(limit);
    }

    Ok(Json(records.into_iter().map(TransactionDto::from).collect()))
}

/// Transaction history as a CSV download.
pub async fn export_transactions(
    Query(params): Query<TransactionsParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let user_id = parse_user_id(&params.user_id)?;
    let records = state.repo.list_transactions(&user_id).await?;

    let csv = render_csv(&records).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

fn render_csv(records: &[TransactionRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "settledAt",
        "side",
        "symbol",
        "quantity",
        "unitPrice",
        "subtotal",
        "platformFee",
        "networkFee",
        "total",
        "status",
    ])?;

    for r in records {
        writer.write_record([
            r.id.as_str(),
            &r.settled_at.to_rfc3339(),
            &r.side.to_string(),
            r.symbol.as_str(),
            &r.quantity.to_canonical_string(),
            &r.unit_price.to_canonical_string(),
            &r.subtotal.to_canonical_string(),
            &r.platform_fee.to_canonical_string(),
            &r.network_fee.to_canonical_string(),
            &r.total.to_canonical_string(),
            &r.status.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
