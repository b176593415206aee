// server/src/pipelines/deposit_pipeline.rs

use tracing::info;

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::ConfirmDepositCtxData;
use crate::state::AppState;
use companion_core::domain::DEPOSIT_AMOUNT;
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

/// GUIDE_SELECTED -> DEPOSIT_PAID. The deposit is collected offline; an admin records it.
/// Confirming twice stops at `apply_order_action` without writing.
pub fn register_confirm_deposit_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<ConfirmDepositCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_admin", false, None),
    ("apply_order_action", false, None),
    ("persist_deposit", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_order", common_steps::load_order::<ConfirmDepositCtxData>);
  p.on_root("authorize_admin", common_steps::authorize_admin::<ConfirmDepositCtxData>);
  p.on_root("apply_order_action", common_steps::apply_order_action::<ConfirmDepositCtxData>);

  p.on_root("persist_deposit", |ctx_data: ContextData<ConfirmDepositCtxData>| {
    Box::pin(async move {
      let (mut tx, order, transition, actor) = {
        let mut guard = ctx_data.write();
        let order = guard.op.loaded_order()?.clone();
        let transition = guard.op.planned_transition()?;
        let actor = guard.op.session.actor_label();
        (guard.op.tx.take()?, order, transition, actor)
      };

      let note = format!("deposit of {} confirmed", DEPOSIT_AMOUNT);
      let updated = common_steps::write_transition(&mut tx, &order, transition, actor, &note).await?;
      info!(order_id = %order.id, "Deposit confirmed.");

      {
        let mut guard = ctx_data.write();
        guard.op.order = Some(updated);
        guard.op.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", common_steps::commit::<ConfirmDepositCtxData>);

  registry.register_pipeline(p);
  tracing::info!("Confirm-deposit pipeline registered.");
}
