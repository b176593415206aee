// tests/registry_tests.rs
mod common;

use common::*;
use companion_core::domain::{OrderAction, OrderStatus};
use companion_core::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, Registry};

#[derive(Clone, Debug, Default)]
struct ProfileCtx {
  name: String,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = Registry::<TestError>::new();

  let mut booking = Pipeline::<BookingCtx, TestError>::new(&[("confirm_deposit", false, None)]);
  booking.on_root("confirm_deposit", transition_handler(OrderAction::ConfirmDeposit));
  registry.register_pipeline(booking);

  let mut profile = Pipeline::<ProfileCtx, TestError>::new(&[("rename", false, None)]);
  profile.on_root("rename", |ctx: ContextData<ProfileCtx>| async move {
    ctx.write().name = "Lin".to_string();
    Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
  });
  registry.register_pipeline(profile);

  assert!(registry.is_registered::<BookingCtx>());
  assert!(registry.is_registered::<ProfileCtx>());

  let booking_ctx = ContextData::new(BookingCtx::in_status(OrderStatus::GuideSelected));
  assert_eq!(registry.run(booking_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(booking_ctx.read().status, Some(OrderStatus::DepositPaid));

  let profile_ctx = ContextData::new(ProfileCtx::default());
  assert_eq!(registry.run(profile_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(profile_ctx.read().name, "Lin");
}

#[tokio::test]
async fn unregistered_context_type_is_a_configuration_error() {
  setup_tracing();
  let registry = Registry::<TestError>::new();
  let result = registry.run(ContextData::new(ProfileCtx::default())).await;
  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("ConfigurationError"));
      assert!(s.contains("No pipeline registered"));
    }
    other => panic!("expected configuration error, got {:?}", other),
  }
}

#[tokio::test]
async fn re_registering_replaces_the_pipeline() {
  setup_tracing();
  let registry = Registry::<TestError>::new();

  let mut first = Pipeline::<BookingCtx, TestError>::new(&[("step", false, None)]);
  first.on_root("step", recording_handler("first"));
  registry.register_pipeline(first);

  let mut second = Pipeline::<BookingCtx, TestError>::new(&[("step", false, None)]);
  second.on_root("step", recording_handler("second"));
  registry.register_pipeline(second);

  let ctx = ContextData::new(BookingCtx::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().steps_executed, vec!["second"]);
}
