// core/src/domain/refund.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::order::OrderAction;
use crate::error::{RuleError, RuleResult};

pub const MAX_ACCOUNT_INFO_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
  Alipay,
  Wechat,
  BankTransfer,
}

impl RefundMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      RefundMethod::Alipay => "alipay",
      RefundMethod::Wechat => "wechat",
      RefundMethod::BankTransfer => "bank_transfer",
    }
  }
}

impl fmt::Display for RefundMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RefundMethod {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "alipay" => Ok(RefundMethod::Alipay),
      "wechat" | "weixin" => Ok(RefundMethod::Wechat),
      "bank_transfer" | "bank" => Ok(RefundMethod::BankTransfer),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

/// A validated refund request, ready to be stored on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
  pub method: RefundMethod,
  pub account_info: String,
  pub reason: Option<String>,
}

impl RefundRequest {
  pub fn new(method: RefundMethod, account_info: &str, reason: Option<&str>) -> RuleResult<Self> {
    let account_info = account_info.trim();
    if account_info.is_empty() || account_info.chars().count() > MAX_ACCOUNT_INFO_LEN {
      return Err(RuleError::InvalidRefundAccount {
        max: MAX_ACCOUNT_INFO_LEN,
      });
    }
    let reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);
    Ok(Self {
      method,
      account_info: account_info.to_string(),
      reason,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundDecision {
  Approve,
  Reject,
}

impl RefundDecision {
  pub fn action(&self) -> OrderAction {
    match self {
      RefundDecision::Approve => OrderAction::ApproveRefund,
      RefundDecision::Reject => OrderAction::RejectRefund,
    }
  }

  /// A decision needs a request on file; orders cancelled before payment have none.
  pub fn ensure_requested(refund_method: Option<&str>) -> RuleResult<()> {
    match refund_method {
      Some(m) if !m.trim().is_empty() => Ok(()),
      _ => Err(RuleError::NoRefundRequested),
    }
  }
}
