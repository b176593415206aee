// server/src/services/seed_service.rs

use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::auth_service;

/// Creates (or promotes) the admin account named by `SEED_ADMIN_PHONE`.
pub async fn seed_admin(pool: &PgPool, config: &AppConfig) -> Result<(), AppError> {
  let (Some(phone), Some(password)) = (&config.seed_admin_phone, &config.seed_admin_password) else {
    warn!("SEED_DB is set but SEED_ADMIN_PHONE / SEED_ADMIN_PASSWORD are missing; nothing to seed.");
    return Ok(());
  };
  let phone = auth_service::normalize_phone(phone)?;
  auth_service::validate_password(password)?;
  let password_hash = auth_service::hash_password(password)?;

  sqlx::query(
    "INSERT INTO users (phone, name, role, password_hash) VALUES ($1, 'Administrator', 'admin', $2) \
     ON CONFLICT (phone) DO UPDATE SET role = 'admin', updated_at = now()",
  )
  .bind(&phone)
  .bind(password_hash)
  .execute(pool)
  .await?;

  info!(%phone, "Admin account seeded.");
  Ok(())
}
