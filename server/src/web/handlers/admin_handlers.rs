// server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::clean_required;
use crate::errors::AppError;
use crate::models::guide::{Guide, GUIDE_COLUMNS};
use crate::models::order::{Order, ORDER_COLUMNS};
use crate::models::user::{User, USER_COLUMNS};
use crate::services::ledger_service::{self, Posting};
use crate::services::session_service::Session;
use crate::state::AppState;
use crate::web::handlers::order_handlers::{status_filter, ListOrdersQuery};
use companion_core::domain::{checked_money, Direction, GuideStanding, TransactionKind, MAX_AMOUNT};

pub const MAX_DESCRIPTION_LEN: usize = 200;

#[derive(Deserialize, Debug)]
pub struct BalanceAdjustmentRequestPayload {
  pub amount: Decimal,
  pub direction: Direction,
  pub description: String,
}

#[instrument(name = "handler::admin_list_users", skip(app_state, session))]
pub async fn list_users_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let users: Vec<User> = sqlx::query_as(&format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS))
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, session))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  session: Session,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let statuses = status_filter(query.status.as_deref())?;
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE ($1::text[] IS NULL OR status = ANY($1)) ORDER BY created_at DESC",
    ORDER_COLUMNS
  ))
  .bind(statuses)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

async fn change_standing(
  app_state: &AppState,
  guide_id: Uuid,
  change: impl FnOnce(&GuideStanding) -> Result<GuideStanding, companion_core::RuleError>,
) -> Result<Guide, AppError> {
  let mut tx = app_state.db_pool.begin().await?;
  let guide: Guide = sqlx::query_as(&format!("SELECT {} FROM guides WHERE id = $1 FOR UPDATE", GUIDE_COLUMNS))
    .bind(guide_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Guide {} not found.", guide_id)))?;

  let next = change(&guide.standing())?;
  let updated: Guide = sqlx::query_as(&format!(
    "UPDATE guides SET verification_status = $2, is_active = $3, updated_at = now() WHERE id = $1 RETURNING {}",
    GUIDE_COLUMNS
  ))
  .bind(guide_id)
  .bind(next.verification_status.as_str())
  .bind(next.is_active)
  .fetch_one(&mut *tx)
  .await?;
  tx.commit().await?;
  Ok(updated)
}

#[instrument(name = "handler::suspend_guide", skip(app_state, session, path), fields(guide_id = %path.as_ref()))]
pub async fn suspend_guide_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let guide = change_standing(&app_state, path.into_inner(), GuideStanding::suspend).await?;
  info!(guide_id = %guide.id, "Guide suspended.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Guide suspended.", "guide": guide })))
}

#[instrument(name = "handler::reinstate_guide", skip(app_state, session, path), fields(guide_id = %path.as_ref()))]
pub async fn reinstate_guide_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let guide = change_standing(&app_state, path.into_inner(), GuideStanding::reinstate).await?;
  info!(guide_id = %guide.id, "Guide reinstated.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Guide reinstated.", "guide": guide })))
}

async fn inconsistent_guides(app_state: &AppState) -> Result<Vec<Guide>, AppError> {
  let guides: Vec<Guide> = sqlx::query_as(&format!("SELECT {} FROM guides ORDER BY created_at", GUIDE_COLUMNS))
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(guides.into_iter().filter(|g| !g.standing().is_consistent()).collect())
}

/// Guides whose `is_active` flag disagrees with their verification status.
#[instrument(name = "handler::guide_consistency_report", skip(app_state, session))]
pub async fn consistency_report_handler(
  app_state: web::Data<AppState>,
  session: Session,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let drifted = inconsistent_guides(&app_state).await?;
  if !drifted.is_empty() {
    warn!("{} guides have an is_active flag that disagrees with their status.", drifted.len());
  }
  Ok(HttpResponse::Ok().json(json!({ "count": drifted.len(), "guides": drifted })))
}

#[instrument(name = "handler::guide_consistency_fix", skip(app_state, session))]
pub async fn consistency_fix_handler(
  app_state: web::Data<AppState>,
  session: Session,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let drifted = inconsistent_guides(&app_state).await?;

  let mut tx = app_state.db_pool.begin().await?;
  let mut fixed = 0u64;
  for guide in &drifted {
    let target = guide.standing().reconciled();
    // The status guard skips rows that changed since they were read.
    let result = sqlx::query(
      "UPDATE guides SET is_active = $2, updated_at = now() WHERE id = $1 AND verification_status = $3",
    )
    .bind(guide.id)
    .bind(target.is_active)
    .bind(target.verification_status.as_str())
    .execute(&mut *tx)
    .await?;
    fixed += result.rows_affected();
  }
  tx.commit().await?;

  info!(fixed, "Guide flags reconciled.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Guide flags reconciled.", "fixed": fixed })))
}

#[instrument(
  name = "handler::balance_adjustment",
  skip(app_state, session, path, req_payload),
  fields(user_id = %path.as_ref(), direction = ?req_payload.direction, amount = %req_payload.amount)
)]
pub async fn balance_adjustment_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: web::Json<BalanceAdjustmentRequestPayload>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let payload = req_payload.into_inner();
  let description = clean_required("description", &payload.description, MAX_DESCRIPTION_LEN)?;
  let amount = checked_money(payload.amount, MAX_AMOUNT)?;
  let user_id = path.into_inner();

  let mut tx = app_state.db_pool.begin().await?;
  let transaction = ledger_service::post(
    &mut tx,
    Posting {
      user_id,
      order_id: None,
      kind: TransactionKind::Adjustment,
      direction: payload.direction,
      amount,
      description: &description,
    },
  )
  .await?;
  tx.commit().await?;

  info!(%user_id, balance_after = %transaction.balance_after, "Balance adjusted by admin.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Balance adjusted.",
      "balance": transaction.balance_after,
      "transaction": transaction,
  })))
}
