// server/src/pipelines/signin_pipeline.rs

use chrono::Utc;
use tracing::{event, warn, Level};

use crate::errors::AppError;
use crate::models::user::{User, USER_COLUMNS};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::services::session_service::{self, Session};
use crate::state::AppState;
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

const BAD_CREDENTIALS: &str = "Invalid phone number or password.";

pub fn register_signin_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_phone_signin", false, None),
    ("verify_user_password_signin", false, None),
    ("issue_session_token_signin", false, None),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      // A malformed phone can never match an account.
      let phone = auth_service::normalize_phone(&guard.phone)
        .map_err(|_| AppError::Auth(BAD_CREDENTIALS.to_string()))?;
      if guard.password.is_empty() {
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      guard.phone = phone;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on_root("fetch_user_by_phone_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (phone, db_pool) = {
        let guard = ctx_data.read();
        (guard.phone.clone(), guard.app_state.db_pool.clone())
      };

      let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE phone = $1", USER_COLUMNS))
        .bind(&phone)
        .fetch_optional(&db_pool)
        .await?;
      let Some(user) = user else {
        warn!(%phone, "Sign-in for unknown phone number.");
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      };
      event!(Level::DEBUG, user_id = %user.id, "User found for signin.");

      {
        ctx_data.write().user = Some(user);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on_root("verify_user_password_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let user = guard
        .user
        .as_ref()
        .ok_or_else(|| AppError::Internal("User missing in signin context.".to_string()))?;
      if !auth_service::verify_password(&user.password_hash, &guard.password)? {
        warn!(user_id = %user.id, "Password mismatch on signin.");
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on_root("issue_session_token_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (user_id, role) = guard
        .user
        .as_ref()
        .map(|u| (u.id, u.role))
        .ok_or_else(|| AppError::Internal("User missing in signin context.".to_string()))?;
      let config = guard.app_state.config.clone();
      let session = Session::issue(user_id, role, config.session_ttl_hours, Utc::now());
      let token = session_service::encode(&session, config.session_secret.as_bytes())?;
      guard.session_token = Some(token);
      event!(Level::INFO, %user_id, %role, "Session issued.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}
