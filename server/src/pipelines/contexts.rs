// server/src/pipelines/contexts.rs

//! Context data for every pipeline. Handlers receive these wrapped in
//! `companion_core::ContextData`; the registry finds a pipeline by its context type.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{BalanceTransaction, Guide, GuideApplication, Order, User};
use crate::services::session_service::Session;
use crate::state::AppState;
use companion_core::domain::{
  ApplicationStatus, OrderAction, RefundDecision, RefundRequest, ReviewDecision, Transition,
};

pub type PgTx = Transaction<'static, Postgres>;

/// The open transaction of a pipeline run, parked between steps.
///
/// A step takes it out, awaits on it, and puts it back. Dropping it without a
/// commit rolls back, so a failing step undoes everything before it.
#[derive(Default)]
pub struct TxSlot(tokio::sync::Mutex<Option<PgTx>>);

impl TxSlot {
  pub fn put(&mut self, tx: PgTx) {
    *self.0.get_mut() = Some(tx);
  }

  pub fn take(&mut self) -> Result<PgTx, AppError> {
    self
      .0
      .get_mut()
      .take()
      .ok_or_else(|| AppError::Internal("No open transaction in pipeline context.".to_string()))
  }
}

// --- Auth ---

pub struct SignupCtxData {
  pub app_state: AppState,
  pub phone: String,
  pub name: String,
  pub password: String,
  pub intended_role: Option<String>,
  pub created_user: Option<User>,
}

pub struct SigninCtxData {
  pub app_state: AppState,
  pub phone: String,
  pub password: String,
  pub user: Option<User>,
  pub session_token: Option<String>,
}

// --- Order lifecycle ---

/// State shared by every order transition pipeline.
pub struct OrderOp {
  pub app_state: AppState,
  pub session: Session,
  pub order_id: Uuid,
  pub action: OrderAction,
  pub tx: TxSlot,
  /// The row as locked by `load_order`, replaced by the updated row on persist.
  pub order: Option<Order>,
  pub transition: Option<Transition>,
}

impl OrderOp {
  pub fn new(app_state: AppState, session: Session, order_id: Uuid, action: OrderAction) -> Self {
    Self {
      app_state,
      session,
      order_id,
      action,
      tx: TxSlot::default(),
      order: None,
      transition: None,
    }
  }

  pub fn loaded_order(&self) -> Result<&Order, AppError> {
    self
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order not loaded in pipeline context.".to_string()))
  }

  pub fn planned_transition(&self) -> Result<Transition, AppError> {
    self
      .transition
      .ok_or_else(|| AppError::Internal("Transition not validated in pipeline context.".to_string()))
  }
}

/// Access to the shared part of an order pipeline context, so the common steps
/// can be registered on every one of them.
pub trait OrderOpCtx: Send + Sync + 'static {
  fn op(&self) -> &OrderOp;
  fn op_mut(&mut self) -> &mut OrderOp;
}

macro_rules! impl_order_op_ctx {
  ($($ctx:ty),* $(,)?) => {
    $(
      impl OrderOpCtx for $ctx {
        fn op(&self) -> &OrderOp {
          &self.op
        }

        fn op_mut(&mut self) -> &mut OrderOp {
          &mut self.op
        }
      }
    )*
  };
}

pub struct AssignGuideCtxData {
  pub op: OrderOp,
  pub guide_id: Uuid,
  pub guide: Option<Guide>,
  pub total_amount: Option<Decimal>,
}

pub struct ConfirmDepositCtxData {
  pub op: OrderOp,
}

pub struct CollectFinalPaymentCtxData {
  pub op: OrderOp,
  pub amount: Decimal,
  pub guide_user_id: Option<Uuid>,
  pub income: Option<BalanceTransaction>,
}

pub struct CancelOrderCtxData {
  pub op: OrderOp,
  pub reason: Option<String>,
}

pub struct RefundRequestCtxData {
  pub op: OrderOp,
  pub refund_method: String,
  pub refund_account_info: String,
  pub reason: Option<String>,
  pub request: Option<RefundRequest>,
}

pub struct RefundDecisionCtxData {
  pub op: OrderOp,
  pub decision: RefundDecision,
  pub note: Option<String>,
}

impl_order_op_ctx!(
  AssignGuideCtxData,
  ConfirmDepositCtxData,
  CollectFinalPaymentCtxData,
  CancelOrderCtxData,
  RefundRequestCtxData,
  RefundDecisionCtxData,
);

// --- Guide verification ---

pub struct ApplicationReviewCtxData {
  pub app_state: AppState,
  pub admin_id: Uuid,
  pub application_id: Uuid,
  pub decision: ReviewDecision,
  pub admin_notes: Option<String>,
  pub tx: TxSlot,
  pub application: Option<GuideApplication>,
  pub new_status: Option<ApplicationStatus>,
  /// The applicant's account, resolved by user id or phone.
  pub applicant_user_id: Option<Uuid>,
  pub guide: Option<Guide>,
}
