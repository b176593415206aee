// server/src/pipelines/signup_pipeline.rs

use tracing::{event, info, warn, Level};

use crate::errors::AppError;
use crate::models::user::{User, USER_COLUMNS};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use crate::state::AppState;
use companion_core::domain::Role;
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

pub const MAX_NAME_LEN: usize = 50;

/// Registers the account registration pipeline. Every account starts as `user`;
/// the guide role is only granted by an approved application.
pub fn register_signup_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user_signup", false, None),
    ("create_user_in_db", false, None),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let phone = auth_service::normalize_phone(&guard.phone)?;
      let name = guard.name.trim().to_string();
      if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        warn!("Invalid display name provided for signup.");
        return Err(AppError::Validation(format!(
          "Name is required (max {} characters).",
          MAX_NAME_LEN
        )));
      }
      auth_service::validate_password(&guard.password)?;
      if let Some(intended) = guard.intended_role.as_deref() {
        match intended.parse::<Role>() {
          Ok(Role::User) | Ok(Role::Guide) => {}
          _ => {
            return Err(AppError::Validation(
              "intended_role must be 'user' or 'guide'.".to_string(),
            ))
          }
        }
      }
      event!(Level::DEBUG, %phone, "Signup input validated.");
      guard.phone = phone;
      guard.name = name;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("check_existing_user_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (phone, db_pool) = {
        let guard = ctx_data.read();
        (guard.phone.clone(), guard.app_state.db_pool.clone())
      };

      let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1)")
        .bind(&phone)
        .fetch_one(&db_pool)
        .await?;
      if exists {
        warn!(%phone, "Attempt to register an existing phone number.");
        return Err(AppError::Conflict("An account with this phone number already exists.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // A concurrent registration with the same phone loses on the unique index and
  // surfaces as a Conflict through `From<sqlx::Error>`.
  signup_p.on_root("create_user_in_db", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (phone, name, password, intended_role, db_pool) = {
        let guard = ctx_data.read();
        (
          guard.phone.clone(),
          guard.name.clone(),
          guard.password.clone(),
          guard.intended_role.as_deref().map(|r| r.trim().to_ascii_lowercase()),
          guard.app_state.db_pool.clone(),
        )
      };

      let password_hash = auth_service::hash_password(&password)?;
      let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (phone, name, role, intended_role, password_hash) VALUES ($1, $2, 'user', $3, $4) \
         RETURNING {}",
        USER_COLUMNS
      ))
      .bind(&phone)
      .bind(&name)
      .bind(intended_role)
      .bind(password_hash)
      .fetch_one(&db_pool)
      .await?;
      info!(user_id = %user.id, %phone, "User registered.");

      {
        ctx_data.write().created_user = Some(user);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
}
