// core/src/domain/ledger.rs

//! Balance ledger arithmetic. Every balance change is recorded as one entry with
//! the balance before and after it; the server writes the entry and the new
//! balance in the same transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::payment::{checked_money, MAX_AMOUNT};
use crate::error::{RuleError, RuleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
  OrderIncome,
  Refund,
  Adjustment,
  Withdrawal,
}

impl TransactionKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransactionKind::OrderIncome => "order_income",
      TransactionKind::Refund => "refund",
      TransactionKind::Adjustment => "adjustment",
      TransactionKind::Withdrawal => "withdrawal",
    }
  }
}

impl fmt::Display for TransactionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TransactionKind {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "order_income" | "income" => Ok(TransactionKind::OrderIncome),
      "refund" => Ok(TransactionKind::Refund),
      "adjustment" => Ok(TransactionKind::Adjustment),
      "withdrawal" => Ok(TransactionKind::Withdrawal),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

impl TryFrom<String> for TransactionKind {
  type Error = RuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

/// Which way an adjustment moves a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  Credit,
  Debit,
}

/// One balance movement. `amount` is signed: credits are positive, debits negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
  pub balance_before: Decimal,
  pub amount: Decimal,
  pub balance_after: Decimal,
}

/// Amounts are cent-precise before any arithmetic, so the stored row satisfies
/// `balance_before + amount == balance_after` exactly.
impl LedgerEntry {
  pub fn credit(balance_before: Decimal, amount: Decimal) -> RuleResult<Self> {
    let amount = checked_money(amount, MAX_AMOUNT)?;
    let balance_after = balance_before
      .checked_add(amount)
      .filter(|b| *b <= MAX_AMOUNT)
      .ok_or(RuleError::AmountOutOfRange { max: MAX_AMOUNT })?;
    Ok(Self {
      balance_before,
      amount,
      balance_after,
    })
  }

  /// Balances never go negative.
  pub fn debit(balance_before: Decimal, amount: Decimal) -> RuleResult<Self> {
    let amount = checked_money(amount, MAX_AMOUNT)?;
    if amount > balance_before {
      return Err(RuleError::InsufficientBalance {
        available: balance_before,
        requested: amount,
      });
    }
    let balance_after = balance_before
      .checked_sub(amount)
      .ok_or(RuleError::AmountOutOfRange { max: MAX_AMOUNT })?;
    Ok(Self {
      balance_before,
      amount: -amount,
      balance_after,
    })
  }

  pub fn apply(direction: Direction, balance_before: Decimal, amount: Decimal) -> RuleResult<Self> {
    match direction {
      Direction::Credit => Self::credit(balance_before, amount),
      Direction::Debit => Self::debit(balance_before, amount),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn credit_records_before_and_after() {
    let entry = LedgerEntry::credit(dec!(100), dec!(600)).unwrap();
    assert_eq!(entry.balance_before, dec!(100));
    assert_eq!(entry.amount, dec!(600));
    assert_eq!(entry.balance_after, dec!(700));
  }

  #[test]
  fn debit_cannot_overdraw() {
    let entry = LedgerEntry::debit(dec!(50), dec!(20.5)).unwrap();
    assert_eq!(entry.amount, dec!(-20.5));
    assert_eq!(entry.balance_after, dec!(29.5));
    assert_eq!(
      LedgerEntry::debit(dec!(50), dec!(50.01)),
      Err(RuleError::InsufficientBalance {
        available: dec!(50),
        requested: dec!(50.01)
      })
    );
  }

  #[test]
  fn direction_picks_credit_or_debit() {
    let up = LedgerEntry::apply(Direction::Credit, dec!(10), dec!(5)).unwrap();
    assert_eq!(up.balance_after, dec!(15));
    let down = LedgerEntry::apply(Direction::Debit, dec!(10), dec!(5)).unwrap();
    assert_eq!(down.amount, dec!(-5));
    assert!(LedgerEntry::apply(Direction::Debit, dec!(4), dec!(5)).is_err());
  }

  #[test]
  fn oversized_amounts_are_rule_errors() {
    let huge: Decimal = serde_json::from_str("\"79228162514264337593543950335\"").unwrap();
    assert_eq!(
      LedgerEntry::credit(dec!(600), huge),
      Err(RuleError::AmountOutOfRange { max: MAX_AMOUNT })
    );
    assert_eq!(
      LedgerEntry::credit(dec!(9999999999.00), dec!(1)),
      Err(RuleError::AmountOutOfRange { max: MAX_AMOUNT })
    );
  }

  #[test]
  fn sub_cent_amounts_are_rejected_before_they_reach_a_balance() {
    assert_eq!(
      LedgerEntry::debit(dec!(100), dec!(0.005)),
      Err(RuleError::SubCentAmount(dec!(0.005)))
    );
    assert!(matches!(
      LedgerEntry::credit(dec!(100), dec!(1.999)),
      Err(RuleError::SubCentAmount(_))
    ));
    let entry = LedgerEntry::debit(dec!(100), dec!(0.50)).unwrap();
    assert_eq!(entry.balance_before + entry.amount, entry.balance_after);
  }

  #[test]
  fn zero_and_negative_amounts_are_rejected() {
    assert_eq!(LedgerEntry::credit(dec!(0), dec!(0)), Err(RuleError::NonPositiveAmount));
    assert_eq!(LedgerEntry::debit(dec!(10), dec!(-1)), Err(RuleError::NonPositiveAmount));
  }
}
