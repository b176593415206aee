// server/src/web/handlers/favorite_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::FavoriteGuide;
use crate::services::session_service::Session;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct AddFavoriteRequestPayload {
  pub guide_id: Uuid,
}

/// Idempotent: favoriting twice answers 200 instead of 201.
#[instrument(name = "handler::add_favorite", skip(app_state, session, req_payload), fields(user_id = %session.user_id, guide_id = %req_payload.guide_id))]
pub async fn add_favorite_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<AddFavoriteRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let guide_id = req_payload.guide_id;
  let guide_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM guides WHERE id = $1)")
    .bind(guide_id)
    .fetch_one(&app_state.db_pool)
    .await?;
  if !guide_exists {
    return Err(AppError::NotFound(format!("Guide {} not found.", guide_id)));
  }

  let inserted = sqlx::query("INSERT INTO favorites (user_id, guide_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
    .bind(session.user_id)
    .bind(guide_id)
    .execute(&app_state.db_pool)
    .await?
    .rows_affected();

  if inserted == 0 {
    return Ok(HttpResponse::Ok().json(json!({ "message": "Guide is already a favorite.", "created": false })));
  }
  info!("Favorite added.");
  Ok(HttpResponse::Created().json(json!({ "message": "Favorite added.", "created": true })))
}

#[instrument(name = "handler::remove_favorite", skip(app_state, session, path), fields(user_id = %session.user_id, guide_id = %path.as_ref()))]
pub async fn remove_favorite_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let guide_id = path.into_inner();
  let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND guide_id = $2")
    .bind(session.user_id)
    .bind(guide_id)
    .execute(&app_state.db_pool)
    .await?
    .rows_affected();
  if removed == 0 {
    return Err(AppError::NotFound("Favorite not found.".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Favorite removed." })))
}

#[instrument(name = "handler::list_favorites", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn list_favorites_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let favorites: Vec<FavoriteGuide> = sqlx::query_as(
    "SELECT g.id AS guide_id, g.display_name, g.city, g.hourly_rate, g.is_active, f.created_at AS favorited_at \
     FROM favorites f JOIN guides g ON g.id = f.guide_id \
     WHERE f.user_id = $1 ORDER BY f.created_at DESC",
  )
  .bind(session.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "favorites": favorites })))
}
