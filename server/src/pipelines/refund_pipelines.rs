// server/src/pipelines/refund_pipelines.rs

//! The refund workflow: the owner files a request on a paid order, an admin
//! approves or rejects it. A rejected request may be filed again.

use tracing::info;

use crate::errors::AppError;
use crate::models::order::Order;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{RefundDecisionCtxData, RefundRequestCtxData};
use crate::state::AppState;
use companion_core::domain::{OrderAction, RefundDecision, RefundMethod, RefundRequest, Transition};
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

pub fn plan_refund_request(
  order: &Order,
  method: &str,
  account_info: &str,
  reason: Option<&str>,
) -> Result<(Transition, RefundRequest), AppError> {
  let transition = order.status.apply(OrderAction::RequestRefund)?;
  let method: RefundMethod = method
    .parse()
    .map_err(|_| AppError::Validation("refund_method must be one of alipay, wechat, bank_transfer.".to_string()))?;
  let request = RefundRequest::new(method, account_info, reason)?;
  Ok((transition, request))
}

pub fn plan_refund_decision(order: &Order, decision: RefundDecision) -> Result<Transition, AppError> {
  let transition = order.status.apply(decision.action())?;
  RefundDecision::ensure_requested(order.refund_method.as_deref())?;
  Ok(transition)
}

/// DEPOSIT_PAID | REFUND_REJECTED -> CANCELLED with a pending refund.
pub fn register_refund_request_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<RefundRequestCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_owner", false, None),
    ("validate_refund_request", false, None),
    ("persist_refund_request", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_order", common_steps::load_order::<RefundRequestCtxData>);
  p.on_root("authorize_owner", common_steps::authorize_owner::<RefundRequestCtxData>);

  p.on_root("validate_refund_request", |ctx_data: ContextData<RefundRequestCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (transition, request) = plan_refund_request(
        guard.op.loaded_order()?,
        &guard.refund_method,
        &guard.refund_account_info,
        guard.reason.as_deref(),
      )?;
      guard.op.transition = Some(transition);
      guard.request = Some(request);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_refund_request", |ctx_data: ContextData<RefundRequestCtxData>| {
    Box::pin(async move {
      let (mut tx, order, transition, actor, request) = {
        let mut guard = ctx_data.write();
        let order = guard.op.loaded_order()?.clone();
        let transition = guard.op.planned_transition()?;
        let request = guard
          .request
          .clone()
          .ok_or_else(|| AppError::Internal("Refund request not validated.".to_string()))?;
        let actor = guard.op.session.actor_label();
        (guard.op.tx.take()?, order, transition, actor, request)
      };

      sqlx::query("UPDATE orders SET refund_method = $2, refund_account_info = $3, refund_reason = $4 WHERE id = $1")
        .bind(order.id)
        .bind(request.method.as_str())
        .bind(&request.account_info)
        .bind(&request.reason)
        .execute(&mut *tx)
        .await?;
      let note = match &request.reason {
        Some(reason) => format!("refund requested via {}: {}", request.method, reason),
        None => format!("refund requested via {}", request.method),
      };
      let updated = common_steps::write_transition(&mut tx, &order, transition, actor, &note).await?;
      info!(order_id = %order.id, method = %request.method, "Refund requested.");

      {
        let mut guard = ctx_data.write();
        guard.op.order = Some(updated);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", common_steps::commit::<RefundRequestCtxData>);

  registry.register_pipeline(p);
  tracing::info!("Refund-request pipeline registered.");
}

/// CANCELLED -> REFUNDED (approve) or REFUND_REJECTED (reject). Needs a request on file.
pub fn register_refund_decision_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<RefundDecisionCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_admin", false, None),
    ("validate_refund_decision", false, None),
    ("persist_refund_decision", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_order", common_steps::load_order::<RefundDecisionCtxData>);
  p.on_root("authorize_admin", common_steps::authorize_admin::<RefundDecisionCtxData>);

  p.on_root("validate_refund_decision", |ctx_data: ContextData<RefundDecisionCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let transition = plan_refund_decision(guard.op.loaded_order()?, guard.decision)?;
      guard.op.transition = Some(transition);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_refund_decision", |ctx_data: ContextData<RefundDecisionCtxData>| {
    Box::pin(async move {
      let (mut tx, order, transition, actor, decision, note) = {
        let mut guard = ctx_data.write();
        let order = guard.op.loaded_order()?.clone();
        let transition = guard.op.planned_transition()?;
        let actor = guard.op.session.actor_label();
        (guard.op.tx.take()?, order, transition, actor, guard.decision, guard.note.clone())
      };

      let verdict = match decision {
        RefundDecision::Approve => "refund approved",
        RefundDecision::Reject => "refund rejected",
      };
      let line = match note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{}: {}", verdict, note),
        None => verdict.to_string(),
      };
      let updated = common_steps::write_transition(&mut tx, &order, transition, actor, &line).await?;
      info!(order_id = %order.id, ?decision, "Refund decided.");

      {
        let mut guard = ctx_data.write();
        guard.op.order = Some(updated);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", common_steps::commit::<RefundDecisionCtxData>);

  registry.register_pipeline(p);
  tracing::info!("Refund-decision pipeline registered.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::order_in;
  use companion_core::domain::OrderStatus;
  use companion_core::RuleError;
  use uuid::Uuid;

  #[test]
  fn an_unpaid_cancellation_has_nothing_to_decide() {
    let order = order_in(OrderStatus::Cancelled, Uuid::new_v4());
    for decision in [RefundDecision::Approve, RefundDecision::Reject] {
      assert!(matches!(
        plan_refund_decision(&order, decision),
        Err(AppError::Rule(RuleError::NoRefundRequested))
      ));
    }
  }

  #[test]
  fn a_filed_request_can_be_approved_or_rejected() {
    let mut order = order_in(OrderStatus::Cancelled, Uuid::new_v4());
    order.refund_method = Some("alipay".into());
    let approved = plan_refund_decision(&order, RefundDecision::Approve).unwrap();
    assert_eq!(approved.target(), OrderStatus::Refunded);
    let rejected = plan_refund_decision(&order, RefundDecision::Reject).unwrap();
    assert_eq!(rejected.target(), OrderStatus::RefundRejected);
  }

  #[test]
  fn decisions_need_a_cancelled_order() {
    let mut order = order_in(OrderStatus::DepositPaid, Uuid::new_v4());
    order.refund_method = Some("alipay".into());
    assert!(matches!(
      plan_refund_decision(&order, RefundDecision::Approve),
      Err(AppError::Rule(RuleError::InvalidTransition { .. }))
    ));
  }

  #[test]
  fn refund_requests_need_a_paid_order_and_a_known_method() {
    let paid = order_in(OrderStatus::DepositPaid, Uuid::new_v4());
    let (transition, request) = plan_refund_request(&paid, "wechat", " wx-123 ", Some("rain")).unwrap();
    assert_eq!(transition.target(), OrderStatus::Cancelled);
    assert_eq!(request.method, RefundMethod::Wechat);
    assert_eq!(request.account_info, "wx-123");

    assert!(matches!(
      plan_refund_request(&paid, "cash", "x", None),
      Err(AppError::Validation(_))
    ));
    assert!(matches!(
      plan_refund_request(&paid, "alipay", "   ", None),
      Err(AppError::Rule(RuleError::InvalidRefundAccount { .. }))
    ));

    let draft = order_in(OrderStatus::Draft, Uuid::new_v4());
    assert!(matches!(
      plan_refund_request(&draft, "alipay", "a@b", None),
      Err(AppError::Rule(RuleError::InvalidTransition { .. }))
    ));

    let rejected = order_in(OrderStatus::RefundRejected, Uuid::new_v4());
    assert!(plan_refund_request(&rejected, "bank_transfer", "6222 0000", None).is_ok());
  }
}
