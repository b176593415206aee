// server/src/pipelines/application_review_pipeline.rs

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::guide::{Guide, GUIDE_COLUMNS};
use crate::models::guide_application::{GuideApplication, APPLICATION_COLUMNS};
use crate::pipelines::contexts::ApplicationReviewCtxData;
use crate::state::AppState;
use companion_core::domain::{ApplicationStatus, GuideStanding, VerificationStatus};
use companion_core::{ContextData, Pipeline, PipelineControl, Registry};

/// Admin review of a guide application. Approval creates or re-verifies the guide
/// row and promotes the account; rejection demotes an existing guide row. The guide
/// row's `is_active` always follows its verification status.
pub fn register_application_review_pipeline(registry: &Registry<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<ApplicationReviewCtxData, AppError>::new(&[
    ("load_application", false, None),
    ("apply_review", false, None),
    ("resolve_applicant", false, None),
    ("sync_guide", false, None),
    ("persist_review", false, None),
    ("commit", false, None),
  ]);

  p.on_root("load_application", |ctx_data: ContextData<ApplicationReviewCtxData>| {
    Box::pin(async move {
      let (db_pool, application_id) = {
        let guard = ctx_data.read();
        (guard.app_state.db_pool.clone(), guard.application_id)
      };

      let mut tx = db_pool.begin().await?;
      let application: GuideApplication = sqlx::query_as(&format!(
        "SELECT {} FROM guide_applications WHERE id = $1 FOR UPDATE",
        APPLICATION_COLUMNS
      ))
      .bind(application_id)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Guide application {} not found.", application_id)))?;

      {
        let mut guard = ctx_data.write();
        guard.application = Some(application);
        guard.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_review", |ctx_data: ContextData<ApplicationReviewCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let current = guard
        .application
        .as_ref()
        .map(|a| a.status)
        .ok_or_else(|| AppError::Internal("Application not loaded.".to_string()))?;
      let next = current.review(guard.decision)?;
      guard.new_status = Some(next);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Applications may predate the account; fall back to matching by phone.
  p.on_root("resolve_applicant", |ctx_data: ContextData<ApplicationReviewCtxData>| {
    Box::pin(async move {
      let (mut tx, linked_user, phone, next) = {
        let mut guard = ctx_data.write();
        let application = guard
          .application
          .clone()
          .ok_or_else(|| AppError::Internal("Application not loaded.".to_string()))?;
        let next = guard
          .new_status
          .ok_or_else(|| AppError::Internal("Review outcome not computed.".to_string()))?;
        (guard.tx.take()?, application.user_id, application.phone, next)
      };

      let applicant: Option<Uuid> = match linked_user {
        Some(id) => Some(id),
        None => {
          sqlx::query_scalar("SELECT id FROM users WHERE phone = $1")
            .bind(&phone)
            .fetch_optional(&mut *tx)
            .await?
        }
      };
      if applicant.is_none() && next == ApplicationStatus::Approved {
        warn!(%phone, "Cannot approve an application without a registered account.");
        return Err(AppError::Validation(
          "The applicant has no registered account yet; it must exist before approval.".to_string(),
        ));
      }

      {
        let mut guard = ctx_data.write();
        guard.applicant_user_id = applicant;
        guard.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("sync_guide", |ctx_data: ContextData<ApplicationReviewCtxData>| {
    Box::pin(async move {
      let (mut tx, application, next, applicant) = {
        let mut guard = ctx_data.write();
        let application = guard
          .application
          .clone()
          .ok_or_else(|| AppError::Internal("Application not loaded.".to_string()))?;
        let next = guard
          .new_status
          .ok_or_else(|| AppError::Internal("Review outcome not computed.".to_string()))?;
        (guard.tx.take()?, application, next, guard.applicant_user_id)
      };

      let guide: Option<Guide> = match (next, applicant) {
        (ApplicationStatus::Approved, Some(user_id)) => {
          let standing = GuideStanding::from_status(VerificationStatus::Verified);
          let guide: Guide = sqlx::query_as(&format!(
            "INSERT INTO guides (user_id, display_name, bio, city, hourly_rate, verification_status, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET display_name = EXCLUDED.display_name, bio = EXCLUDED.bio, \
               city = EXCLUDED.city, hourly_rate = EXCLUDED.hourly_rate, \
               verification_status = EXCLUDED.verification_status, is_active = EXCLUDED.is_active, \
               updated_at = now() \
             RETURNING {}",
            GUIDE_COLUMNS
          ))
          .bind(user_id)
          .bind(&application.display_name)
          .bind(&application.bio)
          .bind(&application.city)
          .bind(application.hourly_rate)
          .bind(standing.verification_status.as_str())
          .bind(standing.is_active)
          .fetch_one(&mut *tx)
          .await?;

          sqlx::query("UPDATE users SET role = 'guide', updated_at = now() WHERE id = $1 AND role = 'user'")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
          info!(%user_id, guide_id = %guide.id, "Guide verified and account promoted.");
          Some(guide)
        }
        (ApplicationStatus::Rejected, Some(user_id)) => {
          let standing = GuideStanding::from_status(VerificationStatus::Rejected);
          let guide: Option<Guide> = sqlx::query_as(&format!(
            "UPDATE guides SET verification_status = $2, is_active = $3, updated_at = now() \
             WHERE user_id = $1 RETURNING {}",
            GUIDE_COLUMNS
          ))
          .bind(user_id)
          .bind(standing.verification_status.as_str())
          .bind(standing.is_active)
          .fetch_optional(&mut *tx)
          .await?;
          if let Some(g) = &guide {
            info!(%user_id, guide_id = %g.id, "Existing guide row demoted after rejection.");
          }
          guide
        }
        _ => None,
      };

      {
        let mut guard = ctx_data.write();
        guard.guide = guide;
        guard.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_review", |ctx_data: ContextData<ApplicationReviewCtxData>| {
    Box::pin(async move {
      let (mut tx, application_id, next, admin_id, admin_notes, applicant) = {
        let mut guard = ctx_data.write();
        let next = guard
          .new_status
          .ok_or_else(|| AppError::Internal("Review outcome not computed.".to_string()))?;
        let admin_notes = guard
          .admin_notes
          .as_deref()
          .map(str::trim)
          .filter(|n| !n.is_empty())
          .map(str::to_string);
        (
          guard.tx.take()?,
          guard.application_id,
          next,
          guard.admin_id,
          admin_notes,
          guard.applicant_user_id,
        )
      };

      let updated: GuideApplication = sqlx::query_as(&format!(
        "UPDATE guide_applications SET status = $2, admin_notes = COALESCE($3, admin_notes), reviewed_by = $4, \
           reviewed_at = now(), user_id = COALESCE(user_id, $5), updated_at = now() \
         WHERE id = $1 RETURNING {}",
        APPLICATION_COLUMNS
      ))
      .bind(application_id)
      .bind(next.as_str())
      .bind(admin_notes)
      .bind(admin_id)
      .bind(applicant)
      .fetch_one(&mut *tx)
      .await?;
      info!(%application_id, status = %updated.status, "Guide application reviewed.");

      {
        let mut guard = ctx_data.write();
        guard.application = Some(updated);
        guard.tx.put(tx);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit", |ctx_data: ContextData<ApplicationReviewCtxData>| {
    Box::pin(async move {
      let tx = { ctx_data.write().tx.take()? };
      tx.commit().await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Application-review pipeline registered.");
}
