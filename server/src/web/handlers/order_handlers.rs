// server/src/web/handlers/order_handlers.rs

//! Order routes. Creation and reads are direct queries; every status change runs
//! the pipeline registered for its context type.

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::clean_optional;
use crate::errors::AppError;
use crate::models::order::{Order, ORDER_COLUMNS};
use crate::pipelines::common_steps::guide_id_of_user;
use crate::pipelines::contexts::{
  AssignGuideCtxData, CancelOrderCtxData, CollectFinalPaymentCtxData, ConfirmDepositCtxData, OrderOp, OrderOpCtx,
  RefundDecisionCtxData, RefundRequestCtxData,
};
use crate::services::session_service::Session;
use crate::state::AppState;
use companion_core::domain::notes::format_note_line;
use companion_core::domain::{OrderAction, OrderStatus, PaymentStatus, RefundDecision};
use companion_core::{ContextData, PipelineResult};

pub const MAX_LOCATION_LEN: usize = 200;
pub const MAX_NOTES_LEN: usize = 1000;

#[derive(Deserialize, Debug)]
pub struct CreateOrderRequestPayload {
  pub location: String,
  pub service_date: NaiveDate,
  pub duration_hours: i32,
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AssignGuideRequestPayload {
  pub guide_id: Uuid,
}

#[derive(Deserialize, Debug)]
pub struct CollectFinalPaymentRequestPayload {
  pub amount: Decimal,
}

#[derive(Deserialize, Debug, Default)]
pub struct CancelOrderRequestPayload {
  pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RefundRequestPayload {
  pub refund_method: String,
  pub refund_account_info: String,
  pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RefundDecisionRequestPayload {
  pub decision: RefundDecision,
  pub note: Option<String>,
}

/// Validated fields of a new order.
#[derive(Debug, PartialEq)]
pub struct NewOrder {
  pub location: String,
  pub service_date: NaiveDate,
  pub duration_hours: i32,
  pub notes: Option<String>,
}

impl CreateOrderRequestPayload {
  pub fn validate(self, today: NaiveDate) -> Result<NewOrder, AppError> {
    let location = self.location.trim().to_string();
    if location.is_empty() || location.chars().count() > MAX_LOCATION_LEN {
      return Err(AppError::Validation(format!(
        "location must be 1 to {} characters.",
        MAX_LOCATION_LEN
      )));
    }
    if !(1..=24).contains(&self.duration_hours) {
      return Err(AppError::Validation("duration_hours must be between 1 and 24.".to_string()));
    }
    if self.service_date < today {
      return Err(AppError::Validation("service_date cannot be in the past.".to_string()));
    }
    let notes = clean_optional(self.notes.as_deref());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
      return Err(AppError::Validation(format!("notes must be at most {} characters.", MAX_NOTES_LEN)));
    }
    Ok(NewOrder {
      location,
      service_date: self.service_date,
      duration_hours: self.duration_hours,
      notes,
    })
  }
}

/// Every stored spelling of the requested status, so legacy rows match too.
pub fn status_filter(raw: Option<&str>) -> Result<Option<Vec<String>>, AppError> {
  match clean_optional(raw) {
    Some(raw) => {
      let status = raw
        .parse::<OrderStatus>()
        .map_err(|_| AppError::Validation(format!("Unknown order status '{}'.", raw)))?;
      Ok(Some(status.spellings().iter().map(|s| s.to_string()).collect()))
    }
    None => Ok(None),
  }
}

/// Runs the pipeline for `ctx` and returns the order row it left behind.
async fn run_order_pipeline<C: OrderOpCtx>(app_state: &AppState, ctx: ContextData<C>) -> Result<(PipelineResult, Order), AppError> {
  let outcome = app_state.workflows.run(ctx.clone()).await?;
  let order = ctx
    .write()
    .op_mut()
    .order
    .take()
    .ok_or_else(|| AppError::Internal("Order pipeline finished without an order.".to_string()))?;
  Ok((outcome, order))
}

fn order_op(app_state: &web::Data<AppState>, session: Session, order_id: Uuid, action: OrderAction) -> OrderOp {
  OrderOp::new(app_state.get_ref().clone(), session, order_id, action)
}

#[instrument(name = "handler::create_order", skip(app_state, session, req_payload), fields(user_id = %session.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<CreateOrderRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let new_order = req_payload.into_inner().validate(Utc::now().date_naive())?;
  let notes = new_order
    .notes
    .as_deref()
    .map(|n| format_note_line(session.actor_label(), n, Utc::now()));

  let order: Order = sqlx::query_as(&format!(
    "INSERT INTO orders (user_id, status, payment_status, duration_hours, service_date, location, notes) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
    ORDER_COLUMNS
  ))
  .bind(session.user_id)
  .bind(OrderStatus::Draft.as_str())
  .bind(PaymentStatus::Unpaid.as_str())
  .bind(new_order.duration_hours)
  .bind(new_order.service_date)
  .bind(&new_order.location)
  .bind(notes)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(order_id = %order.id, "Order created.");
  Ok(HttpResponse::Created().json(json!({ "message": "Order created.", "order": order })))
}

/// Orders the caller placed, plus orders assigned to the caller's guide profile.
#[instrument(name = "handler::list_orders", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  session: Session,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let statuses = status_filter(query.status.as_deref())?;
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders \
     WHERE (user_id = $1 OR guide_id IN (SELECT id FROM guides WHERE user_id = $1)) \
       AND ($2::text[] IS NULL OR status = ANY($2)) \
     ORDER BY created_at DESC",
    ORDER_COLUMNS
  ))
  .bind(session.user_id)
  .bind(statuses)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, session, path), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order: Order = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
    .bind(order_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;

  if !session.is_admin() && !order.is_owned_by(session.user_id) {
    let mut conn = app_state.db_pool.acquire().await?;
    let own_guide = guide_id_of_user(&mut conn, session.user_id).await?;
    if own_guide.is_none() || own_guide != order.guide_id {
      warn!(%order_id, user_id = %session.user_id, "Order read refused.");
      return Err(AppError::Forbidden("You are not allowed to view this order.".to_string()));
    }
  }
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::assign_guide", skip(app_state, session, path, req_payload), fields(order_id = %path.as_ref()))]
pub async fn assign_guide_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: web::Json<AssignGuideRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(AssignGuideCtxData {
    op: order_op(&app_state, session, path.into_inner(), OrderAction::AssignGuide),
    guide_id: req_payload.guide_id,
    guide: None,
    total_amount: None,
  });
  match run_order_pipeline(&app_state, ctx).await? {
    (PipelineResult::Completed, order) => {
      Ok(HttpResponse::Ok().json(json!({ "message": "Guide assigned.", "order": order })))
    }
    (PipelineResult::Stopped, _) => Err(AppError::PipelineHaltedByHandler),
  }
}

/// Idempotent: a second confirmation answers 200 with `alreadyConfirmed: true`.
#[instrument(name = "handler::confirm_deposit", skip(app_state, session, path), fields(order_id = %path.as_ref()))]
pub async fn confirm_deposit_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(ConfirmDepositCtxData {
    op: order_op(&app_state, session, path.into_inner(), OrderAction::ConfirmDeposit),
  });
  let (outcome, order) = run_order_pipeline(&app_state, ctx).await?;
  let already_confirmed = outcome == PipelineResult::Stopped;
  Ok(HttpResponse::Ok().json(json!({
      "message": if already_confirmed { "Deposit was already confirmed." } else { "Deposit confirmed." },
      "alreadyConfirmed": already_confirmed,
      "order": order,
  })))
}

#[instrument(
  name = "handler::collect_final_payment",
  skip(app_state, session, path, req_payload),
  fields(order_id = %path.as_ref(), amount = %req_payload.amount)
)]
pub async fn collect_final_payment_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: web::Json<CollectFinalPaymentRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(CollectFinalPaymentCtxData {
    op: order_op(&app_state, session, path.into_inner(), OrderAction::CollectFinalPayment),
    amount: req_payload.amount,
    guide_user_id: None,
    income: None,
  });
  let outcome = app_state.workflows.run(ctx.clone()).await?;
  if outcome == PipelineResult::Stopped {
    return Err(AppError::PipelineHaltedByHandler);
  }
  let (order, income) = {
    let mut guard = ctx.write();
    (guard.op.order.take(), guard.income.take())
  };
  Ok(HttpResponse::Ok().json(json!({
      "message": "Final payment collected; order completed.",
      "order": order,
      "transaction": income,
  })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, session, path, req_payload), fields(order_id = %path.as_ref()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: Option<web::Json<CancelOrderRequestPayload>>,
) -> Result<HttpResponse, AppError> {
  let reason = req_payload.map(|p| p.into_inner()).unwrap_or_default().reason;
  let ctx = ContextData::new(CancelOrderCtxData {
    op: order_op(&app_state, session, path.into_inner(), OrderAction::Cancel),
    reason,
  });
  match run_order_pipeline(&app_state, ctx).await? {
    (PipelineResult::Completed, order) => {
      Ok(HttpResponse::Ok().json(json!({ "message": "Order cancelled.", "order": order })))
    }
    (PipelineResult::Stopped, _) => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::refund_request", skip(app_state, session, path, req_payload), fields(order_id = %path.as_ref()))]
pub async fn refund_request_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: web::Json<RefundRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(RefundRequestCtxData {
    op: order_op(&app_state, session, path.into_inner(), OrderAction::RequestRefund),
    refund_method: payload.refund_method,
    refund_account_info: payload.refund_account_info,
    reason: payload.reason,
    request: None,
  });
  match run_order_pipeline(&app_state, ctx).await? {
    (PipelineResult::Completed, order) => {
      Ok(HttpResponse::Ok().json(json!({ "message": "Refund requested.", "order": order })))
    }
    (PipelineResult::Stopped, _) => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(
  name = "handler::refund_decision",
  skip(app_state, session, path, req_payload),
  fields(order_id = %path.as_ref(), decision = ?req_payload.decision)
)]
pub async fn refund_decision_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: web::Json<RefundDecisionRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(RefundDecisionCtxData {
    op: order_op(&app_state, session, path.into_inner(), payload.decision.action()),
    decision: payload.decision,
    note: payload.note,
  });
  match run_order_pipeline(&app_state, ctx).await? {
    (PipelineResult::Completed, order) => {
      let message = match payload.decision {
        RefundDecision::Approve => "Refund approved.",
        RefundDecision::Reject => "Refund rejected.",
      };
      Ok(HttpResponse::Ok().json(json!({ "message": message, "order": order })))
    }
    (PipelineResult::Stopped, _) => Err(AppError::PipelineHaltedByHandler),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload(location: &str, date: NaiveDate, hours: i32) -> CreateOrderRequestPayload {
    CreateOrderRequestPayload {
      location: location.to_string(),
      service_date: date,
      duration_hours: hours,
      notes: Some("  meet at the north gate ".to_string()),
    }
  }

  #[test]
  fn new_orders_are_validated() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

    let ok = payload(" West Lake ", tomorrow, 4).validate(today).unwrap();
    assert_eq!(ok.location, "West Lake");
    assert_eq!(ok.notes.as_deref(), Some("meet at the north gate"));

    assert!(payload("West Lake", today, 1).validate(today).is_ok());
    assert!(payload("", tomorrow, 4).validate(today).is_err());
    assert!(payload("West Lake", tomorrow, 0).validate(today).is_err());
    assert!(payload("West Lake", tomorrow, 25).validate(today).is_err());
    let yesterday = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    assert!(payload("West Lake", yesterday, 4).validate(today).is_err());
  }

  #[test]
  fn status_filter_matches_both_vocabularies() {
    let spellings = status_filter(Some("in_progress")).unwrap().unwrap();
    assert!(spellings.contains(&"DEPOSIT_PAID".to_string()));
    assert!(spellings.contains(&"in_progress".to_string()));
    let cancelled = status_filter(Some("CANCELED")).unwrap().unwrap();
    assert!(cancelled.contains(&"canceled".to_string()));
    assert!(cancelled.contains(&"CANCELLED".to_string()));
    assert_eq!(status_filter(Some("  ")).unwrap(), None);
    assert!(matches!(status_filter(Some("shipped")), Err(AppError::Validation(_))));
  }
}
