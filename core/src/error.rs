// core/src/error.rs
use anyhow::Error as AnyhowError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::order::{OrderAction, OrderStatus};

/// Failures raised by the pipeline engine itself, as opposed to the handlers it runs.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Type mismatch during context downcast (expected {expected_type}, step: '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;

/// A booking rule was violated. The message is meant to reach the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
  #[error("Unknown status value '{0}'")]
  UnknownStatus(String),

  #[error("Order in status {from} cannot {action}")]
  InvalidTransition { from: OrderStatus, action: OrderAction },

  #[error("Order already has a guide assigned")]
  GuideAlreadyAssigned,

  #[error("Guide is not available for booking (must be active and verified)")]
  GuideNotAssignable,

  #[error("Final payment must be exactly {expected}, got {actual}")]
  AmountMismatch { expected: Decimal, actual: Decimal },

  #[error("Order total {total} must be greater than the deposit {deposit}")]
  TotalBelowDeposit { total: Decimal, deposit: Decimal },

  #[error("Amount must be greater than zero")]
  NonPositiveAmount,

  #[error("Amount {0} has more than two decimal places")]
  SubCentAmount(Decimal),

  #[error("Amount is out of range (max {max})")]
  AmountOutOfRange { max: Decimal },

  #[error("Insufficient balance: available {available}, requested {requested}")]
  InsufficientBalance { available: Decimal, requested: Decimal },

  #[error("No refund has been requested for this order")]
  NoRefundRequested,

  #[error("Refund account information is required (max {max} characters)")]
  InvalidRefundAccount { max: usize },

  #[error("Application has already been {0} and cannot be reviewed again")]
  ApplicationClosed(String),

  #[error("Guide in status {from} cannot be {action}")]
  InvalidGuideStanding { from: String, action: &'static str },
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
