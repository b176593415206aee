// server/src/web/handlers/application_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{clean_optional, clean_required};
use crate::errors::AppError;
use crate::models::guide_application::{GuideApplication, APPLICATION_COLUMNS};
use crate::pipelines::contexts::{ApplicationReviewCtxData, TxSlot};
use crate::services::session_service::Session;
use crate::state::AppState;
use crate::web::handlers::guide_handlers::{checked_hourly_rate, MAX_DISPLAY_NAME_LEN};
use companion_core::domain::{ApplicationStatus, ReviewDecision};
use companion_core::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
pub struct SubmitApplicationRequestPayload {
  pub display_name: String,
  pub city: Option<String>,
  pub bio: Option<String>,
  pub experience: Option<String>,
  pub hourly_rate: Decimal,
}

#[derive(Deserialize, Debug)]
pub struct ListApplicationsQuery {
  pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ReviewApplicationRequestPayload {
  pub decision: ReviewDecision,
  pub admin_notes: Option<String>,
}

async fn phone_of(app_state: &AppState, user_id: Uuid) -> Result<String, AppError> {
  sqlx::query_scalar("SELECT phone FROM users WHERE id = $1")
    .bind(user_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))
}

/// One application per phone. A rejected or need-more-info application is
/// updated in place and goes back to `pending`.
#[instrument(name = "handler::submit_application", skip(app_state, session, req_payload), fields(user_id = %session.user_id))]
pub async fn submit_application_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<SubmitApplicationRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let display_name = clean_required("display_name", &payload.display_name, MAX_DISPLAY_NAME_LEN)?;
  let hourly_rate = checked_hourly_rate(payload.hourly_rate)?;
  let city = clean_optional(payload.city.as_deref());
  let bio = clean_optional(payload.bio.as_deref());
  let experience = clean_optional(payload.experience.as_deref());
  let phone = phone_of(&app_state, session.user_id).await?;

  let mut tx = app_state.db_pool.begin().await?;
  let existing: Option<GuideApplication> = sqlx::query_as(&format!(
    "SELECT {} FROM guide_applications WHERE phone = $1 FOR UPDATE",
    APPLICATION_COLUMNS
  ))
  .bind(&phone)
  .fetch_optional(&mut *tx)
  .await?;

  let (application, created): (GuideApplication, bool) = match existing {
    Some(current) if !current.status.allows_resubmission() => {
      warn!(application_id = %current.id, status = %current.status, "Application already on file.");
      return Err(AppError::Conflict(format!(
        "An application is already on file with status '{}'.",
        current.status
      )));
    }
    Some(current) => {
      let row = sqlx::query_as(&format!(
        "UPDATE guide_applications SET user_id = $2, display_name = $3, city = $4, bio = $5, experience = $6, \
           hourly_rate = $7, status = $8, updated_at = now() \
         WHERE id = $1 RETURNING {}",
        APPLICATION_COLUMNS
      ))
      .bind(current.id)
      .bind(session.user_id)
      .bind(&display_name)
      .bind(&city)
      .bind(&bio)
      .bind(&experience)
      .bind(hourly_rate)
      .bind(ApplicationStatus::Pending.as_str())
      .fetch_one(&mut *tx)
      .await?;
      (row, false)
    }
    None => {
      let row = sqlx::query_as(&format!(
        "INSERT INTO guide_applications (phone, user_id, display_name, city, bio, experience, hourly_rate, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
        APPLICATION_COLUMNS
      ))
      .bind(&phone)
      .bind(session.user_id)
      .bind(&display_name)
      .bind(&city)
      .bind(&bio)
      .bind(&experience)
      .bind(hourly_rate)
      .bind(ApplicationStatus::Pending.as_str())
      .fetch_one(&mut *tx)
      .await?;
      (row, true)
    }
  };
  tx.commit().await?;

  info!(application_id = %application.id, created, "Guide application submitted.");
  let mut response = if created { HttpResponse::Created() } else { HttpResponse::Ok() };
  Ok(response.json(json!({
      "message": "Application submitted.",
      "application": application,
  })))
}

#[instrument(name = "handler::my_application", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn my_application_handler(
  app_state: web::Data<AppState>,
  session: Session,
) -> Result<HttpResponse, AppError> {
  let phone = phone_of(&app_state, session.user_id).await?;
  let application: Option<GuideApplication> = sqlx::query_as(&format!(
    "SELECT {} FROM guide_applications WHERE phone = $1 OR user_id = $2 ORDER BY created_at DESC LIMIT 1",
    APPLICATION_COLUMNS
  ))
  .bind(&phone)
  .bind(session.user_id)
  .fetch_optional(&app_state.db_pool)
  .await?;
  let application = application.ok_or_else(|| AppError::NotFound("No guide application on file.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "application": application })))
}

#[instrument(name = "handler::admin_list_applications", skip(app_state, session))]
pub async fn admin_list_applications_handler(
  app_state: web::Data<AppState>,
  session: Session,
  query: web::Query<ListApplicationsQuery>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let status = match clean_optional(query.status.as_deref()) {
    Some(raw) => Some(
      raw
        .parse::<ApplicationStatus>()
        .map_err(|_| AppError::Validation(format!("Unknown application status '{}'.", raw)))?,
    ),
    None => None,
  };

  let applications: Vec<GuideApplication> = sqlx::query_as(&format!(
    "SELECT {} FROM guide_applications WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC",
    APPLICATION_COLUMNS
  ))
  .bind(status.map(|s| s.as_str()))
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "applications": applications })))
}

#[instrument(
  name = "handler::review_application",
  skip(app_state, session, path, req_payload),
  fields(application_id = %path.as_ref(), decision = ?req_payload.decision)
)]
pub async fn review_application_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
  req_payload: web::Json<ReviewApplicationRequestPayload>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(ApplicationReviewCtxData {
    app_state: app_state.get_ref().clone(),
    admin_id: session.user_id,
    application_id: path.into_inner(),
    decision: payload.decision,
    admin_notes: payload.admin_notes,
    tx: TxSlot::default(),
    application: None,
    new_status: None,
    applicant_user_id: None,
    guide: None,
  });

  match app_state.workflows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let (application, guide) = {
        let mut guard = ctx.write();
        (guard.application.take(), guard.guide.take())
      };
      Ok(HttpResponse::Ok().json(json!({
          "message": "Application reviewed.",
          "application": application,
          "guide": guide,
      })))
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}
