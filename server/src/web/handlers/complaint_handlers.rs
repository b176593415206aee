// server/src/web/handlers/complaint_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::clean_required;
use crate::errors::AppError;
use crate::models::Complaint;
use crate::services::session_service::Session;
use crate::state::AppState;

pub const MAX_COMPLAINT_LEN: usize = 2000;

const COMPLAINT_COLUMNS: &str = "id, user_id, order_id, content, created_at";

#[derive(Deserialize, Debug)]
pub struct CreateComplaintRequestPayload {
  pub order_id: Option<Uuid>,
  pub content: String,
}

#[instrument(name = "handler::create_complaint", skip(app_state, session, req_payload), fields(user_id = %session.user_id))]
pub async fn create_complaint_handler(
  app_state: web::Data<AppState>,
  session: Session,
  req_payload: web::Json<CreateComplaintRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let content = clean_required("content", &payload.content, MAX_COMPLAINT_LEN)?;

  if let Some(order_id) = payload.order_id {
    let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_optional(&app_state.db_pool)
      .await?;
    match owner {
      None => return Err(AppError::NotFound(format!("Order {} not found.", order_id))),
      Some(owner) if owner != session.user_id => {
        warn!(%order_id, "Complaint about an order the caller does not own.");
        return Err(AppError::Forbidden("You can only file complaints about your own orders.".to_string()));
      }
      Some(_) => {}
    }
  }

  let complaint: Complaint = sqlx::query_as(&format!(
    "INSERT INTO complaints (user_id, order_id, content) VALUES ($1, $2, $3) RETURNING {}",
    COMPLAINT_COLUMNS
  ))
  .bind(session.user_id)
  .bind(payload.order_id)
  .bind(content)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(complaint_id = %complaint.id, "Complaint filed.");
  Ok(HttpResponse::Created().json(json!({ "message": "Complaint submitted.", "complaint": complaint })))
}

#[instrument(name = "handler::list_my_complaints", skip(app_state, session), fields(user_id = %session.user_id))]
pub async fn list_my_complaints_handler(
  app_state: web::Data<AppState>,
  session: Session,
) -> Result<HttpResponse, AppError> {
  let complaints: Vec<Complaint> = sqlx::query_as(&format!(
    "SELECT {} FROM complaints WHERE user_id = $1 ORDER BY created_at DESC",
    COMPLAINT_COLUMNS
  ))
  .bind(session.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "complaints": complaints })))
}

#[instrument(name = "handler::admin_list_complaints", skip(app_state, session))]
pub async fn admin_list_complaints_handler(
  app_state: web::Data<AppState>,
  session: Session,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let complaints: Vec<Complaint> = sqlx::query_as(&format!(
    "SELECT {} FROM complaints ORDER BY created_at DESC",
    COMPLAINT_COLUMNS
  ))
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "complaints": complaints })))
}

#[instrument(name = "handler::admin_delete_complaint", skip(app_state, session, path), fields(complaint_id = %path.as_ref()))]
pub async fn admin_delete_complaint_handler(
  app_state: web::Data<AppState>,
  session: Session,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  session.require_admin()?;
  let complaint_id = path.into_inner();
  let deleted = sqlx::query("DELETE FROM complaints WHERE id = $1")
    .bind(complaint_id)
    .execute(&app_state.db_pool)
    .await?
    .rows_affected();
  if deleted == 0 {
    return Err(AppError::NotFound(format!("Complaint {} not found.", complaint_id)));
  }
  info!(%complaint_id, "Complaint deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Complaint deleted." })))
}
