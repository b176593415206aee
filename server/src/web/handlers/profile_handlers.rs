// server/src/web/handlers/profile_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::{clean_optional, clean_required};
use crate::errors::AppError;
use crate::models::guide::{Guide, GUIDE_COLUMNS};
use crate::models::user::{User, USER_COLUMNS};
use crate::pipelines::signup_pipeline::MAX_NAME_LEN;
use crate::services::session_service::Session;
use crate::state::AppState;

pub const MAX_AVATAR_URL_LEN: usize = 500;

#[derive(Deserialize, Debug)]
pub struct UpdateProfileRequestPayload {
  pub name: Option<String>,
  pub avatar_url: Option<String>,
}

fn validate_avatar_url(raw: &str) -> Result<Option<String>, AppError> {
  let Some(url) = clean_optional(Some(raw)) else {
    return Ok(None);
  };
  if url.len() > MAX_AVATAR_URL_LEN || !(url.starts_with("https://") || url.starts_with("http://")) {
    return Err(AppError::Validation("avatar_url must be an http(s) URL.".to_string()));
  }
  Ok(Some(url))
}

#[instrument(name = "handler::get_profile", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn get_profile_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let user: User = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
    .bind(session.user_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;
  let guide: Option<Guide> = sqlx::query_as(&format!("SELECT {} FROM guides WHERE user_id = $1", GUIDE_COLUMNS))
    .bind(session.user_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "user": user, "guide": guide })))
}

/// Absent fields are left unchanged; a blank `avatar_url` clears it.
#[instrument(name = "handler::update_profile", skip(app_state, session, req_payload), fields(user_id = %session.user_id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<UpdateProfileRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let name = payload
    .name
    .as_deref()
    .map(|n| clean_required("name", n, MAX_NAME_LEN))
    .transpose()?;
  let (set_avatar, avatar_url) = match payload.avatar_url.as_deref() {
    Some(raw) => (true, validate_avatar_url(raw)?),
    None => (false, None),
  };

  let user: User = sqlx::query_as(&format!(
    "UPDATE users SET name = COALESCE($2, name), \
       avatar_url = CASE WHEN $3 THEN $4 ELSE avatar_url END, updated_at = now() \
     WHERE id = $1 RETURNING {}",
    USER_COLUMNS
  ))
  .bind(session.user_id)
  .bind(name)
  .bind(set_avatar)
  .bind(avatar_url)
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;

  info!("Profile updated.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Profile updated.", "user": user })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn avatar_urls_must_be_http() {
    assert_eq!(
      validate_avatar_url(" https://cdn.example.com/a.png ").unwrap().as_deref(),
      Some("https://cdn.example.com/a.png")
    );
    assert_eq!(validate_avatar_url("  ").unwrap(), None);
    assert!(validate_avatar_url("javascript:alert(1)").is_err());
  }
}
