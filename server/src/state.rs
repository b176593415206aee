// server/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use companion_core::Registry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub workflows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
}
