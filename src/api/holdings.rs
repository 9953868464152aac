use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::accounts::parse_user_id;
use crate::api::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsParams {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingDto {
    pub symbol: String,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

/// All non-zero holdings for one account, ordered by symbol.
pub async fn get_holdings(
    Query(params): Query<HoldingsParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<HoldingDto>>, AppError> {
    let user_id = parse_user_id(&params.user_id)?;
    let holdings = state.repo.list_holdings(&user_id).await?;

    Ok(Json(
        holdings
            .into_iter()
            .map(|h| HoldingDto {
                symbol: h.symbol.to_string(),
                quantity: h.quantity.to_canonical_string(),
                display_name: h.display_name,
                icon_ref: h.icon_ref,
            })
            .collect(),
    ))
}
