// tests/common/mod.rs
#![allow(dead_code)]

use companion_core::domain::{OrderAction, OrderStatus};
use companion_core::{ContextData, FlowError, PipelineControl, RuleError};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tracing::Level;

/// In-memory stand-in for an order row moving through a settlement pipeline.
#[derive(Clone, Debug, Default)]
pub struct BookingCtx {
  pub status: Option<OrderStatus>,
  /// Set by a validating step, written by a later persisting step.
  pub planned: Option<OrderStatus>,
  pub total: Decimal,
  pub paid: Decimal,
  pub guide_balance: Decimal,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
  pub notes: Vec<String>,
}

impl BookingCtx {
  pub fn in_status(status: OrderStatus) -> Self {
    Self {
      status: Some(status),
      ..Default::default()
    }
  }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Rule violated: {0}")]
  Rule(#[from] RuleError),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn recording_handler(step_name: &'static str) -> companion_core::Handler<BookingCtx, TestError> {
  Box::new(move |ctx: ContextData<BookingCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, "executed");
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> companion_core::Handler<BookingCtx, TestError> {
  Box::new(move |ctx: ContextData<BookingCtx>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

/// Applies `action` to the context's status through the domain state machine.
pub fn transition_handler(action: OrderAction) -> companion_core::Handler<BookingCtx, TestError> {
  Box::new(move |ctx: ContextData<BookingCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let current = guard.status.unwrap_or(OrderStatus::Draft);
      let transition = current.apply(action)?;
      guard.status = Some(transition.target());
      guard.steps_executed.push(format!("transition:{}", transition.target()));
      Ok(PipelineControl::Continue)
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
