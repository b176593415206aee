// server/src/web/handlers/message_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::clean_required;
use crate::errors::AppError;
use crate::models::{ConversationSummary, Message};
use crate::services::session_service::Session;
use crate::state::AppState;

pub const MAX_MESSAGE_LEN: usize = 2000;

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, is_read, created_at";

#[derive(Deserialize, Debug)]
pub struct SendMessageRequestPayload {
  pub receiver_id: Uuid,
  pub content: String,
}

#[instrument(name = "handler::send_message", skip(app_state, session, req_payload), fields(sender_id = %session.user_id))]
pub async fn send_message_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<SendMessageRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if payload.receiver_id == session.user_id {
    return Err(AppError::Validation("You cannot send a message to yourself.".to_string()));
  }
  let content = clean_required("content", &payload.content, MAX_MESSAGE_LEN)?;

  let receiver_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
    .bind(payload.receiver_id)
    .fetch_one(&app_state.db_pool)
    .await?;
  if !receiver_exists {
    return Err(AppError::NotFound("Receiver not found.".to_string()));
  }

  let message: Message = sqlx::query_as(&format!(
    "INSERT INTO messages (sender_id, receiver_id, content) VALUES ($1, $2, $3) RETURNING {}",
    MESSAGE_COLUMNS
  ))
  .bind(session.user_id)
  .bind(payload.receiver_id)
  .bind(content)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(message_id = %message.id, receiver_id = %message.receiver_id, "Message sent.");
  Ok(HttpResponse::Created().json(json!({ "message": "Message sent.", "data": message })))
}

/// One entry per conversation partner, most recent first.
#[instrument(name = "handler::conversations", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn conversations_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let conversations: Vec<ConversationSummary> = sqlx::query_as(
    "WITH mine AS ( \
       SELECT CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS peer_id, \
              content, created_at, (receiver_id = $1 AND NOT is_read) AS unread \
       FROM messages WHERE sender_id = $1 OR receiver_id = $1 \
     ), latest AS ( \
       SELECT DISTINCT ON (peer_id) peer_id, content, created_at FROM mine ORDER BY peer_id, created_at DESC \
     ) \
     SELECT l.peer_id, u.name AS peer_name, l.content AS last_message, l.created_at AS last_message_at, \
            (SELECT COUNT(*) FROM mine m WHERE m.peer_id = l.peer_id AND m.unread) AS unread_count \
     FROM latest l JOIN users u ON u.id = l.peer_id \
     ORDER BY l.created_at DESC",
  )
  .bind(session.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "conversations": conversations })))
}

/// The full thread, oldest first. Messages received from the peer are marked read.
#[instrument(name = "handler::thread", skip(app_state, session, path), fields(user_id = %session.user_id, peer_id = %path.as_ref()))]
pub async fn thread_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let peer_id = path.into_inner();
  let mut tx = app_state.db_pool.begin().await?;
  let marked = sqlx::query("UPDATE messages SET is_read = TRUE WHERE sender_id = $1 AND receiver_id = $2 AND NOT is_read")
    .bind(peer_id)
    .bind(session.user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  let messages: Vec<Message> = sqlx::query_as(&format!(
    "SELECT {} FROM messages \
     WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1) \
     ORDER BY created_at ASC",
    MESSAGE_COLUMNS
  ))
  .bind(session.user_id)
  .bind(peer_id)
  .fetch_all(&mut *tx)
  .await?;
  tx.commit().await?;

  if marked > 0 {
    info!(marked, "Messages marked as read.");
  }
  Ok(HttpResponse::Ok().json(json!({ "messages": messages })))
}
