// server/src/models/order.rs

use chrono::{DateTime, NaiveDate, Utc};
use companion_core::domain::{OrderStatus, PaymentStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const ORDER_COLUMNS: &str = "id, user_id, guide_id, status, payment_status, total_amount, hourly_rate, \
   duration_hours, service_date, location, notes, refund_method, refund_account_info, refund_reason, \
   created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub guide_id: Option<Uuid>,
  #[sqlx(try_from = "String")]
  pub status: OrderStatus,
  #[sqlx(try_from = "String")]
  pub payment_status: PaymentStatus,
  pub total_amount: Option<Decimal>,
  pub hourly_rate: Option<Decimal>,
  pub duration_hours: i32,
  pub service_date: NaiveDate,
  pub location: String,
  pub notes: Option<String>,
  pub refund_method: Option<String>,
  pub refund_account_info: Option<String>,
  pub refund_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_owned_by(&self, user_id: Uuid) -> bool {
    self.user_id == user_id
  }
}
