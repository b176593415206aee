// core/src/domain/mod.rs

//! Booking rules shared by every route: what an order may move to, how money is
//! split and credited, and when a guide may be shown or booked.

pub mod ledger;
pub mod notes;
pub mod order;
pub mod payment;
pub mod refund;
pub mod role;
pub mod verification;

pub use ledger::{Direction, LedgerEntry, TransactionKind};
pub use order::{OrderAction, OrderStatus, PaymentStatus, Transition};
pub use payment::{checked_money, DEPOSIT_AMOUNT, MAX_AMOUNT, MAX_HOURLY_RATE};
pub use refund::{RefundDecision, RefundMethod, RefundRequest};
pub use role::Role;
pub use verification::{ApplicationStatus, GuideStanding, ReviewDecision, VerificationStatus};
