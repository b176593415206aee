// server/src/pipelines/cancel_pipeline.rs

use tracing::info;

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CancelOrderCtxData;
use crate::state::AppState;
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

/// DRAFT | GUIDE_SELECTED -> CANCELLED. Paid orders go through a refund request instead.
pub fn register_cancel_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_cancel", false, None),
    ("apply_order_action", false, None),
    ("persist_cancel", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_order", common_steps::load_order::<CancelOrderCtxData>);
  p.on_root("authorize_cancel", common_steps::authorize_owner_or_admin::<CancelOrderCtxData>);
  p.on_root("apply_order_action", common_steps::apply_order_action::<CancelOrderCtxData>);

  p.on_root("persist_cancel", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let (mut tx, order, transition, actor, reason) = {
        let mut guard = ctx_data.write();
        let order = guard.op.loaded_order()?.clone();
        let transition = guard.op.planned_transition()?;
        let actor = guard.op.session.actor_label();
        (guard.op.tx.take()?, order, transition, actor, guard.reason.clone())
      };

      let note = match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("order cancelled: {}", reason),
        None => "order cancelled".to_string(),
      };
      let updated = common_steps::write_transition(&mut tx, &order, transition, actor, &note).await?;
      info!(order_id = %order.id, "Order cancelled.");

      {
        let mut guard = ctx_data.write();
        guard.op.order = Some(updated);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", common_steps::commit::<CancelOrderCtxData>);

  registry.register_pipeline(p);
  tracing::info!("Cancel-order pipeline registered.");
}
