// core/src/domain/order.rs

//! The order state machine.
//!
//! Rows written before the status vocabulary was unified may still carry the
//! lowercase spellings (`pending`, `confirmed`, `in_progress`, ...); they parse
//! into the same variants as the uppercase names. New writes always use
//! [`OrderStatus::as_str`].
//!
//! ```text
//! DRAFT --assign--> GUIDE_SELECTED --deposit--> DEPOSIT_PAID --final payment--> COMPLETED
//!   |                    |                          |
//!   +------cancel--------+                   refund request
//!                        v                          v
//!                    CANCELLED <--re-request-- REFUND_REJECTED
//!                        |                          ^
//!                        +-------approve/reject-----+--> REFUNDED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RuleError, RuleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Draft,
  GuideSelected,
  DepositPaid,
  Completed,
  Cancelled,
  Refunded,
  RefundRejected,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Draft,
    OrderStatus::GuideSelected,
    OrderStatus::DepositPaid,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
    OrderStatus::RefundRejected,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Draft => "DRAFT",
      OrderStatus::GuideSelected => "GUIDE_SELECTED",
      OrderStatus::DepositPaid => "DEPOSIT_PAID",
      OrderStatus::Completed => "COMPLETED",
      OrderStatus::Cancelled => "CANCELLED",
      OrderStatus::Refunded => "REFUNDED",
      OrderStatus::RefundRejected => "REFUND_REJECTED",
    }
  }

  /// Every spelling, canonical and legacy, that parses to this status.
  /// Used to match rows that have not been rewritten yet.
  pub fn spellings(&self) -> &'static [&'static str] {
    match self {
      OrderStatus::Draft => &["DRAFT", "pending"],
      OrderStatus::GuideSelected => &["GUIDE_SELECTED", "confirmed"],
      OrderStatus::DepositPaid => &["DEPOSIT_PAID", "deposit_paid", "in_progress"],
      OrderStatus::Completed => &["COMPLETED", "completed"],
      OrderStatus::Cancelled => &["CANCELLED", "cancelled", "CANCELED", "canceled"],
      OrderStatus::Refunded => &["REFUNDED", "refunded"],
      OrderStatus::RefundRejected => &["REFUND_REJECTED", "refund_rejected"],
    }
  }

  /// The single authority on order transitions.
  pub fn apply(self, action: OrderAction) -> RuleResult<Transition> {
    use OrderAction as A;
    use OrderStatus as S;

    let moved = |to: OrderStatus, payment: PaymentStatus| {
      Ok(Transition::Moved {
        from: self,
        to,
        payment_status: payment,
      })
    };

    match (self, action) {
      (S::Draft, A::AssignGuide) => moved(S::GuideSelected, PaymentStatus::Unpaid),

      (S::GuideSelected, A::ConfirmDeposit) => moved(S::DepositPaid, PaymentStatus::DepositPaid),
      (S::DepositPaid | S::Completed, A::ConfirmDeposit) => Ok(Transition::AlreadyApplied { status: self }),

      (S::DepositPaid, A::CollectFinalPayment) => moved(S::Completed, PaymentStatus::FullyPaid),

      (S::Draft | S::GuideSelected, A::Cancel) => moved(S::Cancelled, PaymentStatus::Unpaid),

      (S::DepositPaid | S::RefundRejected, A::RequestRefund) => moved(S::Cancelled, PaymentStatus::RefundPending),

      (S::Cancelled, A::ApproveRefund) => moved(S::Refunded, PaymentStatus::Refunded),
      (S::Cancelled, A::RejectRefund) => moved(S::RefundRejected, PaymentStatus::DepositPaid),

      (from, action) => Err(RuleError::InvalidTransition { from, action }),
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
    match normalized.as_str() {
      "DRAFT" | "PENDING" => Ok(OrderStatus::Draft),
      "GUIDE_SELECTED" | "CONFIRMED" => Ok(OrderStatus::GuideSelected),
      "DEPOSIT_PAID" | "IN_PROGRESS" => Ok(OrderStatus::DepositPaid),
      "COMPLETED" => Ok(OrderStatus::Completed),
      "CANCELLED" | "CANCELED" => Ok(OrderStatus::Cancelled),
      "REFUNDED" => Ok(OrderStatus::Refunded),
      "REFUND_REJECTED" => Ok(OrderStatus::RefundRejected),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

impl TryFrom<String> for OrderStatus {
  type Error = RuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
  AssignGuide,
  ConfirmDeposit,
  CollectFinalPayment,
  Cancel,
  RequestRefund,
  ApproveRefund,
  RejectRefund,
}

impl OrderAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderAction::AssignGuide => "assign a guide",
      OrderAction::ConfirmDeposit => "confirm the deposit",
      OrderAction::CollectFinalPayment => "collect the final payment",
      OrderAction::Cancel => "be cancelled",
      OrderAction::RequestRefund => "request a refund",
      OrderAction::ApproveRefund => "approve a refund",
      OrderAction::RejectRefund => "reject a refund",
    }
  }
}

impl fmt::Display for OrderAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Unpaid,
  DepositPaid,
  FullyPaid,
  RefundPending,
  Refunded,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Unpaid => "unpaid",
      PaymentStatus::DepositPaid => "deposit_paid",
      PaymentStatus::FullyPaid => "fully_paid",
      PaymentStatus::RefundPending => "refund_pending",
      PaymentStatus::Refunded => "refunded",
    }
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentStatus {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "unpaid" | "pending" | "" => Ok(PaymentStatus::Unpaid),
      "deposit_paid" | "partial" => Ok(PaymentStatus::DepositPaid),
      "fully_paid" | "paid" => Ok(PaymentStatus::FullyPaid),
      "refund_pending" => Ok(PaymentStatus::RefundPending),
      "refunded" => Ok(PaymentStatus::Refunded),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

impl TryFrom<String> for PaymentStatus {
  type Error = RuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

/// Result of applying an [`OrderAction`] to an [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Moved {
    from: OrderStatus,
    to: OrderStatus,
    payment_status: PaymentStatus,
  },
  /// The action had already taken effect; callers report success without writing.
  AlreadyApplied { status: OrderStatus },
}

impl Transition {
  pub fn target(&self) -> OrderStatus {
    match self {
      Transition::Moved { to, .. } => *to,
      Transition::AlreadyApplied { status } => *status,
    }
  }

  pub fn is_noop(&self) -> bool {
    matches!(self, Transition::AlreadyApplied { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn both_vocabularies_parse_to_one_status() {
    assert_eq!("pending".parse::<OrderStatus>(), Ok(OrderStatus::Draft));
    assert_eq!("DRAFT".parse::<OrderStatus>(), Ok(OrderStatus::Draft));
    assert_eq!("confirmed".parse::<OrderStatus>(), Ok(OrderStatus::GuideSelected));
    assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::DepositPaid));
    assert_eq!("DEPOSIT_PAID".parse::<OrderStatus>(), Ok(OrderStatus::DepositPaid));
    assert_eq!("refund_rejected".parse::<OrderStatus>(), Ok(OrderStatus::RefundRejected));
    assert!(matches!(
      "shipped".parse::<OrderStatus>(),
      Err(RuleError::UnknownStatus(s)) if s == "shipped"
    ));
  }

  #[test]
  fn every_spelling_round_trips_through_parse() {
    for status in OrderStatus::ALL {
      for spelling in status.spellings() {
        assert_eq!(spelling.parse::<OrderStatus>(), Ok(status), "spelling {spelling}");
      }
    }
  }

  #[test]
  fn american_cancel_spelling_is_matched_by_the_filter() {
    let status: OrderStatus = "canceled".parse().unwrap();
    assert_eq!(status, OrderStatus::Cancelled);
    assert!(status.spellings().contains(&"canceled"));
    assert!(status.spellings().contains(&"CANCELED"));
  }

  #[test]
  fn happy_path_runs_draft_to_completed() {
    let t = OrderStatus::Draft.apply(OrderAction::AssignGuide).unwrap();
    assert_eq!(t.target(), OrderStatus::GuideSelected);
    let t = t.target().apply(OrderAction::ConfirmDeposit).unwrap();
    assert_eq!(
      t,
      Transition::Moved {
        from: OrderStatus::GuideSelected,
        to: OrderStatus::DepositPaid,
        payment_status: PaymentStatus::DepositPaid
      }
    );
    let t = t.target().apply(OrderAction::CollectFinalPayment).unwrap();
    assert_eq!(t.target(), OrderStatus::Completed);
  }

  #[test]
  fn confirm_deposit_short_circuits_when_already_paid() {
    assert!(OrderStatus::DepositPaid.apply(OrderAction::ConfirmDeposit).unwrap().is_noop());
    assert!(OrderStatus::Completed.apply(OrderAction::ConfirmDeposit).unwrap().is_noop());
    assert!(OrderStatus::Draft.apply(OrderAction::ConfirmDeposit).is_err());
  }

  #[test]
  fn guide_can_only_be_assigned_to_a_draft() {
    for status in OrderStatus::ALL {
      let result = status.apply(OrderAction::AssignGuide);
      assert_eq!(result.is_ok(), status == OrderStatus::Draft, "{status}");
    }
  }

  #[test]
  fn final_payment_requires_deposit_paid() {
    for status in OrderStatus::ALL {
      let result = status.apply(OrderAction::CollectFinalPayment);
      assert_eq!(result.is_ok(), status == OrderStatus::DepositPaid, "{status}");
    }
  }

  #[test]
  fn refund_approval_only_from_cancelled() {
    for status in OrderStatus::ALL {
      let result = status.apply(OrderAction::ApproveRefund);
      assert_eq!(result.is_ok(), status == OrderStatus::Cancelled, "{status}");
    }
  }

  #[test]
  fn rejected_refund_can_be_requested_again() {
    let rejected = OrderStatus::DepositPaid
      .apply(OrderAction::RequestRefund)
      .unwrap()
      .target()
      .apply(OrderAction::RejectRefund)
      .unwrap()
      .target();
    assert_eq!(rejected, OrderStatus::RefundRejected);

    let again = rejected.apply(OrderAction::RequestRefund).unwrap();
    assert_eq!(again.target(), OrderStatus::Cancelled);
    assert_eq!(again.target().apply(OrderAction::ApproveRefund).unwrap().target(), OrderStatus::Refunded);
  }

  #[test]
  fn invalid_transition_names_status_and_action() {
    let err = OrderStatus::Completed.apply(OrderAction::Cancel).unwrap_err();
    assert_eq!(err.to_string(), "Order in status COMPLETED cannot be cancelled");
  }

  #[test]
  fn serializes_with_canonical_names() {
    let json = serde_json::to_string(&OrderStatus::RefundRejected).unwrap();
    assert_eq!(json, "\"REFUND_REJECTED\"");
    let json = serde_json::to_string(&PaymentStatus::RefundPending).unwrap();
    assert_eq!(json, "\"refund_pending\"");
  }
}
