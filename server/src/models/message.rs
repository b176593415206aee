// server/src/models/message.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
  pub id: Uuid,
  pub sender_id: Uuid,
  pub receiver_id: Uuid,
  pub content: String,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
}

/// One row per conversation partner.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConversationSummary {
  pub peer_id: Uuid,
  pub peer_name: String,
  pub last_message: String,
  pub last_message_at: DateTime<Utc>,
  pub unread_count: i64,
}
