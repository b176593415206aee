// server/src/models/guide_application.rs

use chrono::{DateTime, Utc};
use companion_core::domain::ApplicationStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const APPLICATION_COLUMNS: &str = "id, phone, user_id, display_name, city, bio, experience, hourly_rate, status, \
   admin_notes, reviewed_by, reviewed_at, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GuideApplication {
  pub id: Uuid,
  pub phone: String,
  pub user_id: Option<Uuid>,
  pub display_name: String,
  pub city: Option<String>,
  pub bio: Option<String>,
  pub experience: Option<String>,
  pub hourly_rate: Decimal,
  #[sqlx(try_from = "String")]
  pub status: ApplicationStatus,
  pub admin_notes: Option<String>,
  pub reviewed_by: Option<Uuid>,
  pub reviewed_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
