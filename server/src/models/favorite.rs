// server/src/models/favorite.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A favorite joined with the guide summary shown in the list.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FavoriteGuide {
  pub guide_id: Uuid,
  pub display_name: String,
  pub city: Option<String>,
  pub hourly_rate: Decimal,
  pub is_active: bool,
  pub favorited_at: DateTime<Utc>,
}
