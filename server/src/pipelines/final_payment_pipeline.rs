// server/src/pipelines/final_payment_pipeline.rs

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::Order;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CollectFinalPaymentCtxData;
use crate::services::ledger_service::{self, Posting};
use crate::services::session_service::Session;
use crate::state::AppState;
use companion_core::domain::payment::validate_final_payment;
use companion_core::domain::{Direction, OrderAction, TransactionKind, Transition};
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

/// The assigned guide or an admin.
pub fn authorize_collection(session: &Session, guide_user_id: Option<Uuid>) -> Result<(), AppError> {
  if guide_user_id == Some(session.user_id) || session.is_admin() {
    return Ok(());
  }
  warn!(user_id = %session.user_id, "Only the assigned guide or an admin may collect the final payment.");
  Err(AppError::Forbidden(
    "Only the assigned guide or an admin may collect the final payment.".to_string(),
  ))
}

/// Returns the planned transition and the amount to credit. The status check
/// comes first: a second collection on a COMPLETED order is a transition
/// error, not an amount error.
pub fn plan_final_payment(
  order: &Order,
  paid: Decimal,
  guide_user_id: Option<Uuid>,
) -> Result<(Transition, Decimal), AppError> {
  let transition = order.status.apply(OrderAction::CollectFinalPayment)?;
  let total = order
    .total_amount
    .ok_or_else(|| AppError::Validation("Order has no total amount; assign a guide first.".to_string()))?;
  let due = validate_final_payment(total, paid)?;
  if guide_user_id.is_none() {
    return Err(AppError::Validation("Order has no assigned guide to credit.".to_string()));
  }
  Ok((transition, due))
}

/// DEPOSIT_PAID -> COMPLETED. The final payment (total minus deposit) is credited
/// to the assigned guide's balance in the same transaction as the status change.
pub fn register_final_payment_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<CollectFinalPaymentCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_collector", false, None),
    ("validate_final_payment", false, None),
    ("persist_settlement", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_order", common_steps::load_order::<CollectFinalPaymentCtxData>);

  // The guide's user id resolved here is also the account credited later.
  p.on_root("authorize_collector", |ctx_data: ContextData<CollectFinalPaymentCtxData>| {
    Box::pin(async move {
      let (mut tx, guide_id, session) = {
        let mut guard = ctx_data.write();
        let guide_id = guard.op.loaded_order()?.guide_id;
        (guard.op.tx.take()?, guide_id, guard.op.session)
      };

      let guide_user_id: Option<Uuid> = match guide_id {
        Some(id) => {
          sqlx::query_scalar("SELECT user_id FROM guides WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        }
        None => None,
      };

      authorize_collection(&session, guide_user_id)?;

      {
        let mut guard = ctx_data.write();
        guard.guide_user_id = guide_user_id;
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("validate_final_payment", |ctx_data: ContextData<CollectFinalPaymentCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (transition, due) = plan_final_payment(guard.op.loaded_order()?, guard.amount, guard.guide_user_id)?;
      guard.op.transition = Some(transition);
      guard.amount = due;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_settlement", |ctx_data: ContextData<CollectFinalPaymentCtxData>| {
    Box::pin(async move {
      let (mut tx, order, transition, amount, guide_user_id, actor) = {
        let mut guard = ctx_data.write();
        let order = guard.op.loaded_order()?.clone();
        let transition = guard.op.planned_transition()?;
        let guide_user_id = guard
          .guide_user_id
          .ok_or_else(|| AppError::Internal("Guide account not resolved.".to_string()))?;
        let actor = guard.op.session.actor_label();
        (guard.op.tx.take()?, order, transition, guard.amount, guide_user_id, actor)
      };

      let note = format!("final payment of {} collected", amount);
      let updated = common_steps::write_transition(&mut tx, &order, transition, actor, &note).await?;
      let description = format!("Income from order {}", order.id);
      let income = ledger_service::post(
        &mut tx,
        Posting {
          user_id: guide_user_id,
          order_id: Some(order.id),
          kind: TransactionKind::OrderIncome,
          direction: Direction::Credit,
          amount,
          description: &description,
        },
      )
      .await?;
      info!(
        order_id = %order.id,
        %guide_user_id,
        %amount,
        balance_after = %income.balance_after,
        "Final payment settled."
      );

      {
        let mut guard = ctx_data.write();
        guard.op.order = Some(updated);
        guard.income = Some(income);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", common_steps::commit::<CollectFinalPaymentCtxData>);

  registry.register_pipeline(p);
  tracing::info!("Final-payment pipeline registered.");
}
