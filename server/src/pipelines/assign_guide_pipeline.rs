// server/src/pipelines/assign_guide_pipeline.rs

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::guide::{Guide, GUIDE_COLUMNS};
use crate::models::order::Order;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::AssignGuideCtxData;
use crate::state::AppState;
use companion_core::domain::payment::order_total;
use companion_core::domain::{OrderAction, Transition};
use companion_core::{ContextData, Pipeline, PipelineControl, Registry, RuleError};

/// Checks that `guide` may take `order` and prices the booking.
pub fn plan_assignment(order: &Order, guide: &Guide) -> Result<(Transition, Decimal), AppError> {
  if order.guide_id.is_some() {
    return Err(AppError::Rule(RuleError::GuideAlreadyAssigned));
  }
  let transition = order.status.apply(OrderAction::AssignGuide)?;
  if !guide.standing().is_listable() {
    warn!(guide_id = %guide.id, status = %guide.verification_status, "Guide cannot take bookings.");
    return Err(AppError::Rule(RuleError::GuideNotAssignable));
  }
  if guide.user_id == order.user_id {
    return Err(AppError::Validation("You cannot book yourself as a guide.".to_string()));
  }
  let total = order_total(guide.hourly_rate, order.duration_hours)?;
  Ok((transition, total))
}

/// DRAFT -> GUIDE_SELECTED, pricing the order from the guide's hourly rate.
pub fn register_assign_guide_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<AssignGuideCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_assign", false, None),
    ("load_guide", false, None),
    ("validate_assignment", false, None),
    ("persist_assignment", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_order", common_steps::load_order::<AssignGuideCtxData>);
  p.on_root("authorize_assign", common_steps::authorize_owner_or_admin::<AssignGuideCtxData>);

  p.on_root("load_guide", |ctx_data: ContextData<AssignGuideCtxData>| {
    Box::pin(async move {
      let (mut tx, guide_id) = {
        let mut guard = ctx_data.write();
        (guard.op.tx.take()?, guard.guide_id)
      };
      let guide: Option<Guide> = sqlx::query_as(&format!("SELECT {} FROM guides WHERE id = $1", GUIDE_COLUMNS))
        .bind(guide_id)
        .fetch_optional(&mut *tx)
        .await?;
      let guide = guide.ok_or_else(|| AppError::NotFound(format!("Guide {} not found.", guide_id)))?;
      {
        let mut guard = ctx_data.write();
        guard.guide = Some(guide);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("validate_assignment", |ctx_data: ContextData<AssignGuideCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (transition, total) = {
        let guide = guard
          .guide
          .as_ref()
          .ok_or_else(|| AppError::Internal("Guide not loaded in pipeline context.".to_string()))?;
        plan_assignment(guard.op.loaded_order()?, guide)?
      };
      guard.op.transition = Some(transition);
      guard.total_amount = Some(total);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_assignment", |ctx_data: ContextData<AssignGuideCtxData>| {
    Box::pin(async move {
      let (mut tx, order, transition, guide, total, actor) = {
        let mut guard = ctx_data.write();
        let order = guard.op.loaded_order()?.clone();
        let transition = guard.op.planned_transition()?;
        let guide = guard
          .guide
          .clone()
          .ok_or_else(|| AppError::Internal("Guide not loaded in pipeline context.".to_string()))?;
        let total = guard
          .total_amount
          .ok_or_else(|| AppError::Internal("Order total not computed.".to_string()))?;
        let actor = guard.op.session.actor_label();
        (guard.op.tx.take()?, order, transition, guide, total, actor)
      };

      sqlx::query("UPDATE orders SET guide_id = $2, hourly_rate = $3, total_amount = $4 WHERE id = $1")
        .bind(order.id)
        .bind(guide.id)
        .bind(guide.hourly_rate)
        .bind(total)
        .execute(&mut *tx)
        .await?;
      let note = format!("guide {} assigned, total {}", guide.display_name, total);
      let updated = common_steps::write_transition(&mut tx, &order, transition, actor, &note).await?;
      info!(order_id = %order.id, guide_id = %guide.id, %total, "Guide assigned to order.");

      {
        let mut guard = ctx_data.write();
        guard.op.order = Some(updated);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", common_steps::commit::<AssignGuideCtxData>);

  registry.register_pipeline(p);
  tracing::info!("Assign-guide pipeline registered.");
}
