// server/src/services/ledger_service.rs

//! Writes balance changes. The caller owns the transaction, so the ledger row,
//! the new balance and whatever caused the change commit or roll back together.

use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::balance_transaction::{BalanceTransaction, TRANSACTION_COLUMNS};
use companion_core::domain::{Direction, LedgerEntry, TransactionKind};

pub struct Posting<'a> {
  pub user_id: Uuid,
  pub order_id: Option<Uuid>,
  pub kind: TransactionKind,
  pub direction: Direction,
  pub amount: Decimal,
  pub description: &'a str,
}

/// Locks the user's balance row, applies the movement and records it.
#[instrument(
  name = "ledger_service::post",
  skip(conn, posting),
  fields(user_id = %posting.user_id, kind = %posting.kind, amount = %posting.amount),
  err(Display)
)]
pub async fn post(conn: &mut PgConnection, posting: Posting<'_>) -> Result<BalanceTransaction, AppError> {
  let balance_before: Decimal = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
    .bind(posting.user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", posting.user_id)))?;

  let entry = LedgerEntry::apply(posting.direction, balance_before, posting.amount)?;

  sqlx::query("UPDATE users SET balance = $2, updated_at = now() WHERE id = $1")
    .bind(posting.user_id)
    .bind(entry.balance_after)
    .execute(&mut *conn)
    .await?;

  let row: BalanceTransaction = sqlx::query_as(&format!(
    "INSERT INTO balance_transactions (user_id, order_id, kind, amount, balance_before, balance_after, description) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
    TRANSACTION_COLUMNS
  ))
  .bind(posting.user_id)
  .bind(posting.order_id)
  .bind(posting.kind.as_str())
  .bind(entry.amount)
  .bind(entry.balance_before)
  .bind(entry.balance_after)
  .bind(posting.description)
  .fetch_one(&mut *conn)
  .await?;

  info!(
    balance_before = %entry.balance_before,
    balance_after = %entry.balance_after,
    "Balance transaction recorded."
  );
  Ok(row)
}

pub async fn recent_for_user(
  conn: &mut PgConnection,
  user_id: Uuid,
  limit: i64,
) -> Result<Vec<BalanceTransaction>, AppError> {
  let rows = sqlx::query_as(&format!(
    "SELECT {} FROM balance_transactions WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    TRANSACTION_COLUMNS
  ))
  .bind(user_id)
  .bind(limit)
  .fetch_all(&mut *conn)
  .await?;
  Ok(rows)
}
