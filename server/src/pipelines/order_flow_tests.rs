// server/src/pipelines/order_flow_tests.rs

//! The order pipelines run against a real database. Each test gets a fresh
//! database from `sqlx::test`; run them with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{Order, ORDER_COLUMNS};
use crate::pipelines::contexts::*;
use crate::services::session_service::Session;
use crate::state::AppState;
use crate::test_support::state_with_pool;
use companion_core::domain::{OrderAction, OrderStatus, PaymentStatus, Role};
use companion_core::{ContextData, PipelineResult, RuleError};

struct World {
  state: AppState,
  owner: Session,
  guide: Session,
  admin: Session,
  guide_id: Uuid,
  order_id: Uuid,
}

async fn insert_user(pool: &PgPool, phone: &str, role: Role) -> Uuid {
  sqlx::query_scalar("INSERT INTO users (phone, name, role, password_hash) VALUES ($1, $2, $3, 'x') RETURNING id")
    .bind(phone)
    .bind(format!("user {phone}"))
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .unwrap()
}

/// An owner with a 4 hour DRAFT order and a verified guide at 200 per hour.
async fn world(pool: PgPool) -> World {
  let owner_id = insert_user(&pool, "+8613800000001", Role::User).await;
  let guide_user_id = insert_user(&pool, "+8613800000002", Role::Guide).await;
  let admin_id = insert_user(&pool, "+8613800000003", Role::Admin).await;
  let guide_id: Uuid = sqlx::query_scalar(
    "INSERT INTO guides (user_id, display_name, hourly_rate, verification_status, is_active) \
     VALUES ($1, 'Lin', 200, 'verified', TRUE) RETURNING id",
  )
  .bind(guide_user_id)
  .fetch_one(&pool)
  .await
  .unwrap();
  let order_id: Uuid = sqlx::query_scalar(
    "INSERT INTO orders (user_id, duration_hours, service_date, location) VALUES ($1, 4, CURRENT_DATE, 'West Lake') RETURNING id",
  )
  .bind(owner_id)
  .fetch_one(&pool)
  .await
  .unwrap();

  let now = Utc::now();
  World {
    state: state_with_pool(pool),
    owner: Session::issue(owner_id, Role::User, 1, now),
    guide: Session::issue(guide_user_id, Role::Guide, 1, now),
    admin: Session::issue(admin_id, Role::Admin, 1, now),
    guide_id,
    order_id,
  }
}

impl World {
  fn op(&self, session: Session, action: OrderAction) -> OrderOp {
    OrderOp::new(self.state.clone(), session, self.order_id, action)
  }

  async fn assign(&self, session: Session, guide_id: Uuid) -> Result<PipelineResult, AppError> {
    let ctx = ContextData::new(AssignGuideCtxData {
      op: self.op(session, OrderAction::AssignGuide),
      guide_id,
      guide: None,
      total_amount: None,
    });
    self.state.workflows.run(ctx).await
  }

  async fn confirm_deposit(&self) -> Result<PipelineResult, AppError> {
    let ctx = ContextData::new(ConfirmDepositCtxData {
      op: self.op(self.admin, OrderAction::ConfirmDeposit),
    });
    self.state.workflows.run(ctx).await
  }

  async fn collect(&self, session: Session, amount: Decimal) -> Result<PipelineResult, AppError> {
    let ctx = ContextData::new(CollectFinalPaymentCtxData {
      op: self.op(session, OrderAction::CollectFinalPayment),
      amount,
      guide_user_id: None,
      income: None,
    });
    self.state.workflows.run(ctx).await
  }

  async fn order(&self) -> Order {
    sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(self.order_id)
      .fetch_one(&self.state.db_pool)
      .await
      .unwrap()
  }

  async fn balance(&self, user_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
      .bind(user_id)
      .fetch_one(&self.state.db_pool)
      .await
      .unwrap()
  }

  async fn income_rows(&self) -> Vec<(Decimal, Decimal, Decimal)> {
    sqlx::query_as(
      "SELECT amount, balance_before, balance_after FROM balance_transactions \
       WHERE order_id = $1 AND kind = 'order_income'",
    )
    .bind(self.order_id)
    .fetch_all(&self.state.db_pool)
    .await
    .unwrap()
  }

  /// Runs the order up to DEPOSIT_PAID.
  async fn paid(&self) {
    self.assign(self.owner, self.guide_id).await.unwrap();
    self.confirm_deposit().await.unwrap();
  }
}

fn note_lines(order: &Order) -> usize {
  order.notes.as_deref().map_or(0, |n| n.lines().count())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn booking_runs_from_draft_to_completed(pool: PgPool) {
  let w = world(pool).await;

  assert_eq!(w.assign(w.owner, w.guide_id).await.unwrap(), PipelineResult::Completed);
  let order = w.order().await;
  assert_eq!(order.status, OrderStatus::GuideSelected);
  assert_eq!(order.guide_id, Some(w.guide_id));
  assert_eq!(order.total_amount, Some(dec!(800)));
  assert_eq!(order.hourly_rate, Some(dec!(200)));
  assert_eq!(note_lines(&order), 1);

  assert_eq!(w.confirm_deposit().await.unwrap(), PipelineResult::Completed);
  let order = w.order().await;
  assert_eq!(order.status, OrderStatus::DepositPaid);
  assert_eq!(order.payment_status, PaymentStatus::DepositPaid);
  assert_eq!(note_lines(&order), 2);

  assert_eq!(w.collect(w.guide, dec!(600)).await.unwrap(), PipelineResult::Completed);
  let order = w.order().await;
  assert_eq!(order.status, OrderStatus::Completed);
  assert_eq!(order.payment_status, PaymentStatus::FullyPaid);
  assert_eq!(note_lines(&order), 3);
  assert!(order.notes.unwrap_or_default().contains("final payment of 600.00 collected"));

  assert_eq!(w.balance(w.guide.user_id).await, dec!(600));
  assert_eq!(w.income_rows().await, vec![(dec!(600), dec!(0), dec!(600))]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn a_second_deposit_confirmation_writes_nothing(pool: PgPool) {
  let w = world(pool).await;
  w.paid().await;
  let before = w.order().await;

  assert_eq!(w.confirm_deposit().await.unwrap(), PipelineResult::Stopped);
  let after = w.order().await;
  assert_eq!(after.status, OrderStatus::DepositPaid);
  assert_eq!(after.notes, before.notes);
  assert_eq!(after.updated_at, before.updated_at);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn a_second_collection_leaves_the_balance_alone(pool: PgPool) {
  let w = world(pool).await;
  w.paid().await;
  w.collect(w.guide, dec!(600)).await.unwrap();

  let err = w.collect(w.guide, dec!(600)).await.unwrap_err();
  assert!(matches!(err, AppError::Rule(RuleError::InvalidTransition { .. })), "{err:?}");
  assert_eq!(w.balance(w.guide.user_id).await, dec!(600));
  assert_eq!(w.income_rows().await.len(), 1);
  assert_eq!(note_lines(&w.order().await), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn a_wrong_amount_changes_nothing(pool: PgPool) {
  let w = world(pool).await;
  w.paid().await;

  let err = w.collect(w.guide, dec!(800)).await.unwrap_err();
  assert!(matches!(err, AppError::Rule(RuleError::AmountMismatch { .. })), "{err:?}");
  let order = w.order().await;
  assert_eq!(order.status, OrderStatus::DepositPaid);
  assert_eq!(note_lines(&order), 2);
  assert_eq!(w.balance(w.guide.user_id).await, dec!(0));
  assert!(w.income_rows().await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn a_failed_credit_rolls_back_the_status_change(pool: PgPool) {
  let w = world(pool).await;
  w.paid().await;
  // The status is written before the credit; an overflowing credit must undo it.
  sqlx::query("UPDATE users SET balance = 9999999999.50 WHERE id = $1")
    .bind(w.guide.user_id)
    .execute(&w.state.db_pool)
    .await
    .unwrap();

  let err = w.collect(w.guide, dec!(600)).await.unwrap_err();
  assert!(matches!(err, AppError::Rule(RuleError::AmountOutOfRange { .. })), "{err:?}");
  let order = w.order().await;
  assert_eq!(order.status, OrderStatus::DepositPaid);
  assert_eq!(order.payment_status, PaymentStatus::DepositPaid);
  assert_eq!(note_lines(&order), 2);
  assert_eq!(w.balance(w.guide.user_id).await, dec!(9999999999.50));
  assert!(w.income_rows().await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn only_the_assigned_guide_collects(pool: PgPool) {
  let w = world(pool).await;
  w.paid().await;

  let err = w.collect(w.owner, dec!(600)).await.unwrap_err();
  assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");
  assert_eq!(w.order().await.status, OrderStatus::DepositPaid);

  assert_eq!(w.collect(w.admin, dec!(600)).await.unwrap(), PipelineResult::Completed);
  assert_eq!(w.balance(w.guide.user_id).await, dec!(600));
  assert_eq!(w.balance(w.admin.user_id).await, dec!(0));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn a_guide_cannot_book_themselves(pool: PgPool) {
  let w = world(pool).await;
  sqlx::query("UPDATE orders SET user_id = $2 WHERE id = $1")
    .bind(w.order_id)
    .bind(w.guide.user_id)
    .execute(&w.state.db_pool)
    .await
    .unwrap();

  let err = w.assign(w.guide, w.guide_id).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)), "{err:?}");
  let order = w.order().await;
  assert_eq!(order.status, OrderStatus::Draft);
  assert_eq!(order.guide_id, None);
  assert_eq!(order.total_amount, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn an_assigned_order_cannot_be_reassigned(pool: PgPool) {
  let w = world(pool).await;
  w.assign(w.owner, w.guide_id).await.unwrap();

  let err = w.assign(w.owner, w.guide_id).await.unwrap_err();
  assert!(matches!(err, AppError::Rule(RuleError::GuideAlreadyAssigned)), "{err:?}");
  assert_eq!(note_lines(&w.order().await), 1);
}
