use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::db::LedgerError;
use crate::domain::{Decimal, UserId};
use crate::engine::SettlementError;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub user_id: String,
    pub cash_balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangeRequest {
    /// Positive decimal amount as a string.
    pub amount: String,
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let user_id = parse_user_id(&req.user_id)?;
    let created = state.repo.create_account(&user_id).await?;
    let account = state
        .repo
        .get_account(&user_id)
        .await?
        .ok_or_else(|| AppError::Internal("account missing after create".into()))?;

    Ok(Json(AccountResponse {
        user_id: account.user_id.to_string(),
        cash_balance: account.cash_balance.to_canonical_string(),
        created: Some(created),
    }))
}

pub async fn get_account(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AccountResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let account = state
        .repo
        .get_account(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", user_id)))?;

    Ok(Json(AccountResponse {
        user_id: account.user_id.to_string(),
        cash_balance: account.cash_balance.to_canonical_string(),
        created: None,
    }))
}

pub async fn deposit(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<BalanceChangeRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    adjust(state, &user_id, &req.amount, false).await
}

pub async fn withdraw(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<BalanceChangeRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    adjust(state, &user_id, &req.amount, true).await
}

async fn adjust(
    state: AppState,
    user_id: &str,
    amount: &str,
    negate: bool,
) -> Result<Json<AccountResponse>, AppError> {
    let user_id = parse_user_id(user_id)?;
    let amount = parse_amount(amount)?;
    let delta = if negate { -amount } else { amount };

    let new_balance = state
        .repo
        .adjust_balance(&user_id, delta)
        .await
        .map_err(ledger_error)?;

    Ok(Json(AccountResponse {
        user_id: user_id.to_string(),
        cash_balance: new_balance.to_canonical_string(),
        created: None,
    }))
}

fn ledger_error(err: LedgerError) -> AppError {
    match err {
        LedgerError::AccountNotFound(user) => AppError::NotFound(format!("account {}", user)),
        LedgerError::InsufficientBalance {
            available,
            required,
        } => AppError::Rejected(SettlementError::InsufficientBalance {
            available,
            required,
        }),
        other => AppError::Internal(other.to_string()),
    }
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 128 {
        return Err(AppError::BadRequest("Invalid user id".into()));
    }
    Ok(UserId::new(trimmed.to_string()))
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, AppError> {
    let amount = Decimal::from_str_canonical(raw)
        .map_err(|_| AppError::BadRequest("Invalid decimal amount".into()))?;
    if !amount.is_positive() {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert!(parse_user_id("u-1").is_ok());
        assert!(parse_user_id("   ").is_err());
        assert!(parse_user_id(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_parse_amount_requires_positive() {
        assert!(parse_amount("10.50").is_ok());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("ten").is_err());
    }
}
