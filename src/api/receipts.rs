use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::accounts::parse_user_id;
use crate::api::AppState;
use crate::engine::Receipt;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptParams {
    pub user_id: String,
    /// "text", "html" or "json" (default).
    pub format: Option<String>,
}

/// Re-render the receipt for a persisted transaction.
pub async fn get_receipt(
    Path(tx_id): Path<String>,
    Query(params): Query<ReceiptParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let user_id = parse_user_id(&params.user_id)?;
    let record = state
        .repo
        .get_transaction(&user_id, &tx_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {}", tx_id)))?;

    let receipt = Receipt::new(record);
    let response = match params.format.as_deref() {
        None | Some("json") => Json(receipt).into_response(),
        Some("text") => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            receipt.to_text(),
        )
            .into_response(),
        Some("html") => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            receipt.to_html(),
        )
            .into_response(),
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown receipt format: {}",
                other
            )))
        }
    };

    Ok(response)
}
