// core/src/domain/payment.rs

//! Deposit and final-payment arithmetic. Payments are collected by hand, so the
//! only thing the system can do is insist the recorded amounts add up.

use rust_decimal::Decimal;

use crate::error::{RuleError, RuleResult};

/// Fixed partial payment collected before the service takes place.
pub const DEPOSIT_AMOUNT: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Largest value a stored amount or balance may take (two decimals, ten integer digits).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest hourly rate a guide may charge (two decimals, eight integer digits).
pub const MAX_HOURLY_RATE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// A positive amount with at most cent precision, no larger than `max`.
/// Returns it at scale 2, the way it will be stored.
pub fn checked_money(amount: Decimal, max: Decimal) -> RuleResult<Decimal> {
  if amount <= Decimal::ZERO {
    return Err(RuleError::NonPositiveAmount);
  }
  if amount.normalize().scale() > 2 {
    return Err(RuleError::SubCentAmount(amount));
  }
  if amount > max {
    return Err(RuleError::AmountOutOfRange { max });
  }
  let mut stored = amount;
  stored.rescale(2);
  Ok(stored)
}

/// Amount still owed after the deposit.
pub fn final_payment_due(total: Decimal) -> Decimal {
  total - DEPOSIT_AMOUNT
}

/// The collected final payment must match `total - deposit` to the cent.
pub fn validate_final_payment(total: Decimal, paid: Decimal) -> RuleResult<Decimal> {
  let expected = final_payment_due(total);
  if paid.normalize() != expected.normalize() {
    return Err(RuleError::AmountMismatch { expected, actual: paid });
  }
  Ok(expected)
}

/// Price of a booking. The total has to leave something for the final payment.
pub fn order_total(hourly_rate: Decimal, hours: i32) -> RuleResult<Decimal> {
  if hours <= 0 {
    return Err(RuleError::NonPositiveAmount);
  }
  let hourly_rate = checked_money(hourly_rate, MAX_HOURLY_RATE)?;
  let total = hourly_rate
    .checked_mul(Decimal::from(hours))
    .filter(|t| *t <= MAX_AMOUNT)
    .ok_or(RuleError::AmountOutOfRange { max: MAX_AMOUNT })?;
  if total <= DEPOSIT_AMOUNT {
    return Err(RuleError::TotalBelowDeposit {
      total,
      deposit: DEPOSIT_AMOUNT,
    });
  }
  Ok(total)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn deposit_is_two_hundred() {
    assert_eq!(DEPOSIT_AMOUNT, dec!(200));
  }

  #[test]
  fn final_payment_must_equal_total_minus_deposit() {
    assert_eq!(validate_final_payment(dec!(800), dec!(600)), Ok(dec!(600)));
    assert_eq!(validate_final_payment(dec!(800), dec!(600.00)), Ok(dec!(600)));
    assert_eq!(
      validate_final_payment(dec!(800), dec!(800)),
      Err(RuleError::AmountMismatch {
        expected: dec!(600),
        actual: dec!(800)
      })
    );
    assert!(validate_final_payment(dec!(800), dec!(599.99)).is_err());
  }

  #[test]
  fn limits_match_the_numeric_columns() {
    assert_eq!(MAX_AMOUNT, dec!(9999999999.99));
    assert_eq!(MAX_HOURLY_RATE, dec!(99999999.99));
  }

  #[test]
  fn money_is_positive_cent_precise_and_bounded() {
    assert_eq!(checked_money(dec!(12.5), MAX_AMOUNT), Ok(dec!(12.50)));
    assert_eq!(checked_money(dec!(12.5000), MAX_AMOUNT).unwrap().scale(), 2);
    assert_eq!(checked_money(dec!(0), MAX_AMOUNT), Err(RuleError::NonPositiveAmount));
    assert_eq!(
      checked_money(dec!(0.005), MAX_AMOUNT),
      Err(RuleError::SubCentAmount(dec!(0.005)))
    );
    assert_eq!(
      checked_money(dec!(100000000), MAX_HOURLY_RATE),
      Err(RuleError::AmountOutOfRange { max: MAX_HOURLY_RATE })
    );
  }

  #[test]
  fn total_is_rate_times_hours_and_exceeds_deposit() {
    assert_eq!(order_total(dec!(200), 4), Ok(dec!(800)));
    assert!(matches!(
      order_total(dec!(100), 2),
      Err(RuleError::TotalBelowDeposit { .. })
    ));
    assert_eq!(order_total(dec!(0), 3), Err(RuleError::NonPositiveAmount));
    assert!(matches!(order_total(dec!(66.666), 3), Err(RuleError::SubCentAmount(_))));
    assert_eq!(order_total(dec!(99999999.99), 24), Ok(dec!(2399999999.76)));
  }

  #[test]
  fn oversized_rate_is_a_rule_error_not_a_panic() {
    let huge: Decimal = "79228162514264337593543950335".parse().unwrap();
    assert!(matches!(order_total(huge, 24), Err(RuleError::AmountOutOfRange { .. })));
  }
}
