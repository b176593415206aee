// tests/error_handling_tests.rs
mod common;

use common::*;
use companion_core::{ContextData, FlowError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn pipeline_can_use_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<BookingCtx, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |ctx: ContextData<BookingCtx>| async move {
    ctx.write().notes.push("ran".to_string());
    Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
  });

  let ctx = ContextData::new(BookingCtx::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().notes, vec!["ran"]);

  let mut failing = Pipeline::<BookingCtx, FlowError>::new(&[("fail_task", false, None)]);
  failing.on_root("fail_task", |_ctx: ContextData<BookingCtx>| async move {
    Err::<PipelineControl, FlowError>(FlowError::Internal("intentional".to_string()))
  });
  match failing.run(ContextData::new(BookingCtx::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "intentional"),
    other => panic!("expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn anyhow_errors_convert_into_handler_errors() {
  setup_tracing();
  let mut pipeline = Pipeline::<BookingCtx, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |_ctx: ContextData<BookingCtx>| async move {
    Err::<PipelineControl, anyhow::Error>(anyhow::anyhow!("database went away"))
  });

  match pipeline.run(ContextData::new(BookingCtx::default())).await {
    Err(FlowError::HandlerError { source }) => assert_eq!(source.to_string(), "database went away"),
    other => panic!("expected HandlerError, got {:?}", other),
  }
}
