// server/src/web/extractors.rs

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::{ready, Ready};
use tracing::debug;

use crate::errors::AppError;
use crate::services::session_service::{self, Session, SESSION_COOKIE};
use crate::state::AppState;

/// Any handler taking a `Session` argument requires a valid, unexpired session cookie.
impl FromRequest for Session {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(session_from_request(req))
  }
}

fn session_from_request(req: &HttpRequest) -> Result<Session, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
  let cookie = req.cookie(SESSION_COOKIE).ok_or_else(|| {
    debug!("Request without a session cookie.");
    AppError::Auth("Please log in first.".to_string())
  })?;
  session_service::decode(cookie.value(), state.config.session_secret.as_bytes(), Utc::now())
}
