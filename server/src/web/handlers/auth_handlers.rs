// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::user::{User, USER_COLUMNS};
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::session_service::{self, Session};
use crate::state::AppState;
use companion_core::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
pub struct RegisterRequestPayload {
  pub phone: String,
  pub name: String,
  pub password: String,
  pub intended_role: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub phone: String,
  pub password: String,
}

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(phone = %req_payload.phone))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    phone: payload.phone,
    name: payload.name,
    password: payload.password,
    intended_role: payload.intended_role,
    created_user: None,
  });

  match app_state.workflows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let user = ctx.write().created_user.take().ok_or_else(|| {
        warn!("Signup pipeline completed but no user was recorded.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      info!(user_id = %user.id, "Registration successful.");
      Ok(HttpResponse::Created().json(json!({
          "message": "Account created successfully.",
          "user": user,
      })))
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(phone = %req_payload.phone))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    phone: payload.phone,
    password: payload.password,
    user: None,
    session_token: None,
  });

  match app_state.workflows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let (user, token) = {
        let mut guard = ctx.write();
        (guard.user.take(), guard.session_token.take())
      };
      let (Some(user), Some(token)) = (user, token) else {
        warn!("Signin pipeline completed without a user or session token.");
        return Err(AppError::Auth("Sign-in did not produce a session.".to_string()));
      };
      info!(user_id = %user.id, "Login successful.");
      Ok(
        HttpResponse::Ok()
          .cookie(session_service::session_cookie(token, &app_state.config))
          .json(json!({
              "message": "Login successful.",
              "user": user,
          })),
      )
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::logout", skip(app_state))]
pub async fn logout_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok()
    .cookie(session_service::removal_cookie(&app_state.config))
    .json(json!({ "message": "Logged out." }))
}

/// The current account. When the stored role has changed since login (a guide
/// application was approved), the session cookie is reissued with the new role.
#[instrument(name = "handler::me", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn me_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let user: User = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
    .bind(session.user_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;

  let mut response = HttpResponse::Ok();
  if user.role != session.role {
    info!(from = %session.role, to = %user.role, "Role changed since login; refreshing session.");
    let refreshed = Session::issue(user.id, user.role, app_state.config.session_ttl_hours, Utc::now());
    let token = session_service::encode(&refreshed, app_state.config.session_secret.as_bytes())?;
    response.cookie(session_service::session_cookie(token, &app_state.config));
  }
  Ok(response.json(json!({ "user": user })))
}
