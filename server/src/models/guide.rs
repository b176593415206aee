// server/src/models/guide.rs

use chrono::{DateTime, Utc};
use companion_core::domain::{GuideStanding, VerificationStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const GUIDE_COLUMNS: &str =
  "id, user_id, display_name, bio, city, hourly_rate, verification_status, is_active, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Guide {
  pub id: Uuid,
  pub user_id: Uuid,
  pub display_name: String,
  pub bio: Option<String>,
  pub city: Option<String>,
  pub hourly_rate: Decimal,
  #[sqlx(try_from = "String")]
  pub verification_status: VerificationStatus,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Guide {
  pub fn standing(&self) -> GuideStanding {
    GuideStanding {
      verification_status: self.verification_status,
      is_active: self.is_active,
    }
  }
}
