// server/src/models/balance_transaction.rs

use chrono::{DateTime, Utc};
use companion_core::domain::TransactionKind;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const TRANSACTION_COLUMNS: &str =
  "id, user_id, order_id, kind, amount, balance_before, balance_after, description, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BalanceTransaction {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_id: Option<Uuid>,
  #[sqlx(try_from = "String")]
  pub kind: TransactionKind,
  pub amount: Decimal,
  pub balance_before: Decimal,
  pub balance_after: Decimal,
  pub description: String,
  pub created_at: DateTime<Utc>,
}
