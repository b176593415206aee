// server/src/web/handlers/balance_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::ledger_service;
use crate::services::session_service::Session;
use crate::state::AppState;

pub const RECENT_TRANSACTIONS: i64 = 50;

#[instrument(name = "handler::balance", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn get_balance_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let mut conn = app_state.db_pool.acquire().await?;
  let balance: Decimal = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
    .bind(session.user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;
  let transactions = ledger_service::recent_for_user(&mut conn, session.user_id, RECENT_TRANSACTIONS).await?;
  Ok(HttpResponse::Ok().json(json!({ "balance": balance, "transactions": transactions })))
}
