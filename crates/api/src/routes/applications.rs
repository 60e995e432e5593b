//! Application submission and queue position routes.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use domain::models::application::{
    SubmissionResponse, SubmissionStatus, SubmitApplicationRequest,
};
use domain::models::capacity::{CapacityStatusResponse, PoolStatus};
use domain::models::queue::QueuePosition;
use persistence::repositories::CapacityRepository;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::admission::Decision;

/// Submit a beta application.
///
/// POST /api/v1/beta/applications
///
/// Evaluates the submission and returns approved, pending, or at_capacity
/// along with the score and the remaining spots.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(request): Json<SubmitApplicationRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    request.validate()?;

    let evaluation = state.admission.evaluate(&request).await.map_err(ApiError::from)?;

    let response = match evaluation.decision {
        Decision::Approved {
            spots_remaining, ..
        } => SubmissionResponse {
            status: SubmissionStatus::Approved,
            score: evaluation.score.capped,
            spots_remaining,
            position: None,
            referral_code: None,
        },
        Decision::Pending {
            application_id,
            referral_code,
            at_capacity,
        } => {
            // Position is a best-effort snapshot; the submission outcome
            // stands even if the ranking read fails.
            let position = state
                .queue
                .position(application_id)
                .await
                .ok()
                .map(|p| p.effective_position);
            let status = CapacityRepository::new(state.pool.clone()).status().await?;

            SubmissionResponse {
                status: if at_capacity {
                    SubmissionStatus::AtCapacity
                } else {
                    SubmissionStatus::Pending
                },
                score: evaluation.score.capped,
                spots_remaining: status.spots_remaining(),
                position,
                referral_code: Some(referral_code),
            }
        }
    };

    Ok(Json(response))
}

/// Queue position of a pending application.
///
/// GET /api/v1/beta/applications/:id/position
///
/// Positions are eventually-consistent snapshots; the Cache-Control
/// header advertises the supported refresh interval.
pub async fn queue_position(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let position: QueuePosition = state.queue.position(application_id).await?;
    let cache_control = format!("max-age={}", state.config.admission.position_refresh_secs);
    Ok(([(header::CACHE_CONTROL, cache_control)], Json(position)))
}

/// Public capacity status.
///
/// GET /api/v1/beta/capacity
pub async fn capacity_status(
    State(state): State<AppState>,
) -> Result<Json<CapacityStatusResponse>, ApiError> {
    let entity = CapacityRepository::new(state.pool.clone()).status().await?;
    let status: PoolStatus = entity.into();
    Ok(Json(status.into()))
}
