// server/src/web/handlers/guide_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{clean_optional, clean_required};
use crate::errors::AppError;
use crate::models::guide::{Guide, GUIDE_COLUMNS};
use crate::services::session_service::Session;
use crate::state::AppState;
use companion_core::domain::{checked_money, VerificationStatus, MAX_HOURLY_RATE};

pub const MAX_DISPLAY_NAME_LEN: usize = 50;

#[derive(Deserialize, Debug)]
pub struct ListGuidesQuery {
  pub city: Option<String>,
  pub q: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateGuideRequestPayload {
  pub display_name: Option<String>,
  pub bio: Option<String>,
  pub city: Option<String>,
  pub hourly_rate: Option<Decimal>,
}

/// Escapes `LIKE` wildcards in user input.
/// A rate the `hourly_rate` columns can hold exactly.
pub(crate) fn checked_hourly_rate(rate: Decimal) -> Result<Decimal, AppError> {
  Ok(checked_money(rate, MAX_HOURLY_RATE)?)
}

fn like_pattern(term: &str) -> String {
  let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

/// Public listing: only active and verified guides.
#[instrument(name = "handler::list_guides", skip(app_state))]
pub async fn list_guides_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListGuidesQuery>,
) -> Result<HttpResponse, AppError> {
  let city = clean_optional(query.city.as_deref());
  let search = clean_optional(query.q.as_deref()).map(|q| like_pattern(&q));

  let guides: Vec<Guide> = sqlx::query_as(&format!(
    "SELECT {} FROM guides \
     WHERE is_active AND verification_status = $1 \
       AND ($2::text IS NULL OR city = $2) \
       AND ($3::text IS NULL OR display_name ILIKE $3 OR bio ILIKE $3) \
     ORDER BY created_at DESC",
    GUIDE_COLUMNS
  ))
  .bind(VerificationStatus::Verified.as_str())
  .bind(city)
  .bind(search)
  .fetch_all(&app_state.db_pool)
  .await?;

  info!("Fetched {} listable guides.", guides.len());
  Ok(HttpResponse::Ok().json(json!({ "guides": guides })))
}

/// Hidden guides are reported as missing, except to admins.
#[instrument(name = "handler::get_guide", skip(app_state, session, path))]
pub async fn get_guide_handler(
  app_state: web::Data<AppState>,
  session: Option<Session>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let guide_id = path.into_inner();
  let guide: Option<Guide> = sqlx::query_as(&format!("SELECT {} FROM guides WHERE id = $1", GUIDE_COLUMNS))
    .bind(guide_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  let is_admin = session.is_some_and(|s| s.is_admin());
  match guide {
    Some(guide) if guide.standing().is_listable() || is_admin => Ok(HttpResponse::Ok().json(json!({ "guide": guide }))),
    _ => {
      warn!(%guide_id, "Guide not found or not listable.");
      Err(AppError::NotFound(format!("Guide {} not found.", guide_id)))
    }
  }
}

async fn own_guide(app_state: &AppState, user_id: Uuid) -> Result<Guide, AppError> {
  sqlx::query_as(&format!("SELECT {} FROM guides WHERE user_id = $1", GUIDE_COLUMNS))
    .bind(user_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("You do not have a guide profile.".to_string()))
}

#[instrument(name = "handler::my_guide", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn my_guide_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let guide = own_guide(&app_state, session.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "guide": guide })))
}

/// Edits presentation fields only; verification status is never client-writable.
#[instrument(name = "handler::update_my_guide", skip(app_state, session, req_payload), fields(user_id = %session.user_id))]
pub async fn update_my_guide_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<UpdateGuideRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let current = own_guide(&app_state, session.user_id).await?;

  let display_name = match payload.display_name.as_deref() {
    Some(name) => clean_required("display_name", name, MAX_DISPLAY_NAME_LEN)?,
    None => current.display_name,
  };
  let bio = payload.bio.as_deref().map_or(current.bio, |b| clean_optional(Some(b)));
  let city = payload.city.as_deref().map_or(current.city, |c| clean_optional(Some(c)));
  let hourly_rate = match payload.hourly_rate {
    Some(rate) => checked_hourly_rate(rate)?,
    None => current.hourly_rate,
  };

  let guide: Guide = sqlx::query_as(&format!(
    "UPDATE guides SET display_name = $2, bio = $3, city = $4, hourly_rate = $5, updated_at = now() \
     WHERE id = $1 RETURNING {}",
    GUIDE_COLUMNS
  ))
  .bind(current.id)
  .bind(display_name)
  .bind(bio)
  .bind(city)
  .bind(hourly_rate)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(guide_id = %guide.id, "Guide profile updated.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Guide profile updated.", "guide": guide })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hourly_rate_must_fit_the_column() {
    use companion_core::RuleError;
    use rust_decimal_macros::dec;

    assert_eq!(checked_hourly_rate(dec!(150.5)).unwrap(), dec!(150.50));
    assert!(matches!(
      checked_hourly_rate(dec!(0)),
      Err(AppError::Rule(RuleError::NonPositiveAmount))
    ));
    assert!(matches!(
      checked_hourly_rate(dec!(150.555)),
      Err(AppError::Rule(RuleError::SubCentAmount(_)))
    ));
    assert!(matches!(
      checked_hourly_rate(dec!(100000000)),
      Err(AppError::Rule(RuleError::AmountOutOfRange { .. }))
    ));
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("tea"), "%tea%");
    assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
  }
}
