// server/src/pipelines/common_steps.rs

//! Steps shared by the order transition pipelines. Each is generic over the
//! context type and registered with `on_root(step, common_steps::x::<Ctx>)`.

use chrono::Utc;
use sqlx::PgConnection;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{Order, ORDER_COLUMNS};
use crate::pipelines::contexts::OrderOpCtx;
use crate::services::session_service::Session;
use companion_core::domain::notes::append_note;
use companion_core::domain::Transition;
use companion_core::{ContextData, PipelineControl};

/// Opens the transaction and locks the order row for the rest of the run.
#[instrument(name = "step::load_order", skip_all, err(Display))]
pub async fn load_order<C: OrderOpCtx>(ctx_data: ContextData<C>) -> Result<PipelineControl, AppError> {
  let (db_pool, order_id) = {
    let guard = ctx_data.read();
    (guard.op().app_state.db_pool.clone(), guard.op().order_id)
  };

  let mut tx = db_pool.begin().await?;
  let order: Order = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS))
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
      warn!(%order_id, "Order not found.");
      AppError::NotFound(format!("Order {} not found.", order_id))
    })?;
  debug!(%order_id, status = %order.status, "Order locked.");

  {
    let mut guard = ctx_data.write();
    let op = guard.op_mut();
    op.order = Some(order);
    op.tx.put(tx);
  }
  Ok(PipelineControl::Continue)
}

fn check_access(session: &Session, order: &Order, allow_owner: bool, allow_admin: bool) -> Result<(), AppError> {
  if (allow_admin && session.is_admin()) || (allow_owner && order.is_owned_by(session.user_id)) {
    return Ok(());
  }
  warn!(user_id = %session.user_id, order_id = %order.id, "Caller may not act on this order.");
  Err(AppError::Forbidden("You are not allowed to perform this action on this order.".to_string()))
}

pub async fn authorize_owner_or_admin<C: OrderOpCtx>(ctx_data: ContextData<C>) -> Result<PipelineControl, AppError> {
  let guard = ctx_data.read();
  check_access(&guard.op().session, guard.op().loaded_order()?, true, true)?;
  Ok(PipelineControl::Continue)
}

pub async fn authorize_owner<C: OrderOpCtx>(ctx_data: ContextData<C>) -> Result<PipelineControl, AppError> {
  let guard = ctx_data.read();
  check_access(&guard.op().session, guard.op().loaded_order()?, true, false)?;
  Ok(PipelineControl::Continue)
}

pub async fn authorize_admin<C: OrderOpCtx>(ctx_data: ContextData<C>) -> Result<PipelineControl, AppError> {
  let guard = ctx_data.read();
  guard.op().session.require_admin()?;
  Ok(PipelineControl::Continue)
}

/// Runs the state machine. An action that already took effect stops the pipeline
/// so nothing is written; handlers report that as success.
pub async fn apply_order_action<C: OrderOpCtx>(ctx_data: ContextData<C>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let op = guard.op_mut();
  let (status, action) = (op.loaded_order()?.status, op.action);
  let transition = status.apply(action)?;
  op.transition = Some(transition);
  if transition.is_noop() {
    info!(order_id = %op.order_id, %status, %action, "Action already applied; nothing to write.");
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

/// Writes the planned status pair and one notes line; returns the updated row.
pub async fn write_transition(
  conn: &mut PgConnection,
  order: &Order,
  transition: Transition,
  actor: &str,
  note: &str,
) -> Result<Order, AppError> {
  let Transition::Moved { to, payment_status, .. } = transition else {
    return Ok(order.clone());
  };
  let notes = append_note(order.notes.as_deref(), actor, note, Utc::now());
  let updated: Order = sqlx::query_as(&format!(
    "UPDATE orders SET status = $2, payment_status = $3, notes = $4, updated_at = now() WHERE id = $1 RETURNING {}",
    ORDER_COLUMNS
  ))
  .bind(order.id)
  .bind(to.as_str())
  .bind(payment_status.as_str())
  .bind(notes)
  .fetch_one(&mut *conn)
  .await?;
  info!(order_id = %order.id, from = %order.status, to = %to, "Order status changed.");
  Ok(updated)
}

/// Commits the run's transaction. Always the last step of an order pipeline.
#[instrument(name = "step::commit", skip_all, err(Display))]
pub async fn commit<C: OrderOpCtx>(ctx_data: ContextData<C>) -> Result<PipelineControl, AppError> {
  let tx = { ctx_data.write().op_mut().tx.take()? };
  tx.commit().await?;
  Ok(PipelineControl::Continue)
}

/// The guide id whose row belongs to `user_id`, if that user is a guide.
pub async fn guide_id_of_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
  let id = sqlx::query_scalar("SELECT id FROM guides WHERE user_id = $1")
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
  Ok(id)
}
