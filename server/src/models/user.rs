// server/src/models/user.rs

use chrono::{DateTime, Utc};
use companion_core::domain::Role;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const USER_COLUMNS: &str =
  "id, phone, name, role, intended_role, password_hash, balance, avatar_url, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub phone: String,
  pub name: String,
  #[sqlx(try_from = "String")]
  pub role: Role,
  pub intended_role: Option<String>,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub balance: Decimal,
  pub avatar_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
