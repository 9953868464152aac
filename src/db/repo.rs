//! Repository layer for ledger database operations.

use crate::domain::{Account, Decimal, Holding, Side, Symbol, TransactionRecord, TxStatus, UserId};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Errors from ledger mutations.
///
/// The two Insufficient* variants are business rejections raised inside the
/// settlement transaction, after re-reading authoritative state; Storage
/// covers the database itself failing.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },
    #[error("insufficient holding: have {available}, requested {requested}")]
    InsufficientHolding {
        available: Decimal,
        requested: Decimal,
    },
    #[error("account not found: {0}")]
    AccountNotFound(UserId),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Denormalized display fields carried onto a holding on buy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldingMetadata {
    pub display_name: Option<String>,
    pub icon_ref: Option<String>,
}

/// Post-settlement ledger state, read back from the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementUpdate {
    pub new_balance: Decimal,
    /// Post-trade holding quantity; zero when the record was deleted.
    pub new_quantity: Decimal,
    pub holding_deleted: bool,
}

/// Repository for ledger operations, one per process over a shared pool.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Create an account with a zero balance. Returns false if it already
    /// existed.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn create_account(&self, user_id: &UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, cash_balance, created_at)
            VALUES (?, '0', ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch an account by user id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query("SELECT user_id, cash_balance FROM accounts WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            let balance_str: String = r.get("cash_balance");
            Account {
                user_id: UserId::new(r.get("user_id")),
                cash_balance: Decimal::from_str(&balance_str).unwrap_or_default(),
            }
        }))
    }

    /// Apply a signed delta to the cash balance (deposit positive, withdraw
    /// negative). Rejects any delta that would take the balance below zero.
    ///
    /// # Errors
    /// `AccountNotFound` if no account row exists, `InsufficientBalance` on
    /// overdraw, `Storage` on database failure.
    pub async fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT cash_balance FROM accounts WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.clone()))?;

        let balance_str: String = row.get("cash_balance");
        let balance = Decimal::from_str(&balance_str).unwrap_or_default();
        let new_balance = (balance + delta).round_currency();

        if new_balance.is_negative() {
            return Err(LedgerError::InsufficientBalance {
                available: balance,
                required: delta.abs(),
            });
        }

        sqlx::query("UPDATE accounts SET cash_balance = ? WHERE user_id = ?")
            .bind(new_balance.to_canonical_string())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(new_balance)
    }

    /// Fetch one holding; absent rows mean a quantity of zero.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_holding(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
    ) -> Result<Option<Holding>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT symbol, quantity, display_name, icon_ref
            FROM holdings
            WHERE user_id = ? AND symbol = ?
            "#,
        )
        .bind(user_id.as_str())
        .bind(symbol.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(holding_from_row))
    }

    /// List all holdings for an account, ordered by symbol.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_holdings(&self, user_id: &UserId) -> Result<Vec<Holding>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, quantity, display_name, icon_ref
            FROM holdings
            WHERE user_id = ?
            ORDER BY symbol ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(holding_from_row).collect())
    }

    /// Upsert a holding record.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn set_holding(
        &self,
        user_id: &UserId,
        holding: &Holding,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO holdings (user_id, symbol, quantity, display_name, icon_ref)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, symbol) DO UPDATE SET
                quantity = excluded.quantity,
                display_name = COALESCE(excluded.display_name, holdings.display_name),
                icon_ref = COALESCE(excluded.icon_ref, holdings.icon_ref)
            "#,
        )
        .bind(user_id.as_str())
        .bind(holding.symbol.as_str())
        .bind(holding.quantity.to_canonical_string())
        .bind(holding.display_name.as_deref())
        .bind(holding.icon_ref.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a holding record. Returns false if none existed.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete_holding(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM holdings WHERE user_id = ? AND symbol = ?")
            .bind(user_id.as_str())
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Settle an order against the ledger: one transaction covering the
    /// balance write and the holding write.
    ///
    /// State is re-read inside the transaction, so a stale snapshot taken by
    /// the caller cannot overdraw the balance or oversell the holding. The
    /// balance never goes below zero, including sells whose fees exceed the
    /// proceeds. A holding driven to zero or below is deleted, never stored
    /// at zero.
    /// Busy-database errors are retried up to `busy_retries` times; any other
    /// storage failure aborts with nothing committed.
    ///
    /// # Errors
    /// `InsufficientBalance` / `InsufficientHolding` when the authoritative
    /// state no longer covers the order, `Storage` when the database fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_settlement(
        &self,
        user_id: &UserId,
        side: Side,
        symbol: &Symbol,
        quantity: Decimal,
        total: Decimal,
        metadata: &HoldingMetadata,
        busy_retries: u32,
    ) -> Result<SettlementUpdate, LedgerError> {
        let mut attempt = 0;
        loop {
            match self
                .try_apply_settlement(user_id, side, symbol, quantity, total, metadata)
                .await
            {
                Err(LedgerError::Storage(e)) if is_busy(&e) && attempt < busy_retries => {
                    attempt += 1;
                    warn!(
                        "settlement write busy for {} (attempt {}/{}), retrying",
                        user_id, attempt, busy_retries
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_apply_settlement(
        &self,
        user_id: &UserId,
        side: Side,
        symbol: &Symbol,
        quantity: Decimal,
        total: Decimal,
        metadata: &HoldingMetadata,
    ) -> Result<SettlementUpdate, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // Authoritative re-read; a missing account behaves as a zero balance.
        let balance = sqlx::query("SELECT cash_balance FROM accounts WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .map(|r| {
                let s: String = r.get("cash_balance");
                Decimal::from_str(&s).unwrap_or_default()
            })
            .unwrap_or_else(Decimal::zero);

        let held = sqlx::query("SELECT quantity FROM holdings WHERE user_id = ? AND symbol = ?")
            .bind(user_id.as_str())
            .bind(symbol.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .map(|r| {
                let s: String = r.get("quantity");
                Decimal::from_str(&s).unwrap_or_default()
            })
            .unwrap_or_else(Decimal::zero);

        let (new_balance, new_quantity) = match side {
            Side::Buy => {
                if balance < total {
                    return Err(LedgerError::InsufficientBalance {
                        available: balance,
                        required: total,
                    });
                }
                (balance - total, held + quantity)
            }
            Side::Sell => {
                if held < quantity {
                    return Err(LedgerError::InsufficientHolding {
                        available: held,
                        requested: quantity,
                    });
                }
                // A negative total means fees exceed the proceeds and the
                // difference is debited from cash. Never below zero.
                let credited = balance + total;
                if credited.is_negative() {
                    return Err(LedgerError::InsufficientBalance {
                        available: balance,
                        required: total.abs(),
                    });
                }
                (credited, held - quantity)
            }
        };
        let new_balance = new_balance.round_currency();
        let new_quantity = new_quantity.round_quantity();

        sqlx::query(
            r#"
            INSERT INTO accounts (user_id, cash_balance, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET cash_balance = excluded.cash_balance
            "#,
        )
        .bind(user_id.as_str())
        .bind(new_balance.to_canonical_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;

        let holding_deleted = if new_quantity.is_positive() {
            sqlx::query(
                r#"
                INSERT INTO holdings (user_id, symbol, quantity, display_name, icon_ref)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(user_id, symbol) DO UPDATE SET
                    quantity = excluded.quantity,
                    display_name = COALESCE(excluded.display_name, holdings.display_name),
                    icon_ref = COALESCE(excluded.icon_ref, holdings.icon_ref)
                "#,
            )
            .bind(user_id.as_str())
            .bind(symbol.as_str())
            .bind(new_quantity.to_canonical_string())
            .bind(metadata.display_name.as_deref())
            .bind(metadata.icon_ref.as_deref())
            .execute(&mut *tx)
            .await?;
            false
        } else {
            sqlx::query("DELETE FROM holdings WHERE user_id = ? AND symbol = ?")
                .bind(user_id.as_str())
                .bind(symbol.as_str())
                .execute(&mut *tx)
                .await?;
            true
        };

        tx.commit().await?;

        Ok(SettlementUpdate {
            new_balance,
            new_quantity: if holding_deleted {
                Decimal::zero()
            } else {
                new_quantity
            },
            holding_deleted,
        })
    }

    /// Append a transaction record. Records are immutable once written.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, side, symbol, display_name, quantity, unit_price,
                subtotal, platform_fee, network_fee, total, settled_at, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.user_id.as_str())
        .bind(record.side.to_string())
        .bind(record.symbol.as_str())
        .bind(record.display_name.as_deref())
        .bind(record.quantity.to_canonical_string())
        .bind(record.unit_price.to_canonical_string())
        .bind(record.subtotal.to_canonical_string())
        .bind(record.platform_fee.to_canonical_string())
        .bind(record.network_fee.to_canonical_string())
        .bind(record.total.to_canonical_string())
        .bind(record.settled_at.timestamp_millis())
        .bind(record.status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get one transaction by id, scoped to its account.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_transaction(
        &self,
        user_id: &UserId,
        id: &str,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, side, symbol, display_name, quantity, unit_price,
                   subtotal, platform_fee, network_fee, total, settled_at, status
            FROM transactions
            WHERE user_id = ? AND id = ?
            "#,
        )
        .bind(user_id.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    /// List an account's transactions, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_transactions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, side, symbol, display_name, quantity, unit_price,
                   subtotal, platform_fee, network_fee, total, settled_at, status
            FROM transactions
            WHERE user_id = ?
            ORDER BY settled_at DESC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(record_from_row).collect())
    }
}

fn holding_from_row(row: SqliteRow) -> Holding {
    let quantity_str: String = row.get("quantity");
    Holding {
        symbol: Symbol::new(row.get::<String, _>("symbol")),
        quantity: Decimal::from_str(&quantity_str).unwrap_or_default(),
        display_name: row.get("display_name"),
        icon_ref: row.get("icon_ref"),
    }
}

fn record_from_row(row: SqliteRow) -> TransactionRecord {
    let side_str: String = row.get("side");
    let settled_at_ms: i64 = row.get("settled_at");
    let dec = |name: &str| {
        let s: String = row.get(name);
        Decimal::from_str(&s).unwrap_or_default()
    };

    TransactionRecord {
        id: row.get("id"),
        user_id: UserId::new(row.get("user_id")),
        side: Side::parse(&side_str).unwrap_or(Side::Buy),
        symbol: Symbol::new(row.get::<String, _>("symbol")),
        display_name: row.get("display_name"),
        quantity: dec("quantity"),
        unit_price: dec("unit_price"),
        subtotal: dec("subtotal"),
        platform_fee: dec("platform_fee"),
        network_fee: dec("network_fee"),
        total: dec("total"),
        settled_at: DateTime::<Utc>::from_timestamp_millis(settled_at_ms)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        status: TxStatus::Confirmed,
    }
}

fn is_busy(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            let msg = db.message();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
        _ => false,
    }
}
