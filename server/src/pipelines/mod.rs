// server/src/pipelines/mod.rs

//! Defines and registers every pipeline used by the server.

use crate::errors::AppError;
use crate::state::AppState;
use companion_core::Registry;

pub mod common_steps;
pub mod contexts;

pub mod application_review_pipeline;
pub mod assign_guide_pipeline;
pub mod cancel_pipeline;
pub mod deposit_pipeline;
pub mod final_payment_pipeline;
pub mod refund_pipelines;
pub mod signin_pipeline;
pub mod signup_pipeline;

#[cfg(test)]
mod order_flow_tests;

/// Registers all pipelines. Called once at startup, and by tests that build an `AppState`.
pub fn register_all_pipelines(registry: &Registry<AppError>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(registry, app_state);
  signin_pipeline::register_signin_pipeline(registry, app_state);

  assign_guide_pipeline::register_assign_guide_pipeline(registry, app_state);
  deposit_pipeline::register_confirm_deposit_pipeline(registry, app_state);
  final_payment_pipeline::register_final_payment_pipeline(registry, app_state);
  cancel_pipeline::register_cancel_pipeline(registry, app_state);
  refund_pipelines::register_refund_request_pipeline(registry, app_state);
  refund_pipelines::register_refund_decision_pipeline(registry, app_state);

  application_review_pipeline::register_application_review_pipeline(registry, app_state);

  tracing::info!("All application pipelines registered.");
}
