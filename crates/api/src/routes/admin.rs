//! Admin override routes.
//!
//! Manual and bulk approval bypass the score threshold but never the
//! capacity check; every slot still comes from the shared ledger.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::application::{
    Application, ApplicationStatus, RejectApplicationRequest,
};
use domain::models::capacity::{CapacityStatusResponse, PoolStatus};
use persistence::repositories::{ApplicationRepository, CapacityRepository};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::admission::ApproveOutcome;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const MAX_BULK_IDS: usize = 100;

/// Admin stats response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminStatsResponse {
    pub capacity: i32,
    pub approved_count: i32,
    pub spots_remaining: i32,
    pub pending_count: i64,
}

/// Response after a manual approval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ManualApprovalResponse {
    pub application_id: Uuid,
    pub profile_id: Uuid,
    pub granted_invites: Vec<String>,
    pub spots_remaining: i32,
}

/// Request for bulk approval.
#[derive(Debug, Deserialize)]
pub struct BulkApproveRequest {
    pub ids: Vec<Uuid>,
}

/// Per-application outcome of a bulk approval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BulkApprovalOutcome {
    pub application_id: Uuid,
    pub outcome: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BulkApproveResponse {
    pub results: Vec<BulkApprovalOutcome>,
}

/// Request to adjust the capacity pool.
#[derive(Debug, Deserialize)]
pub struct SetCapacityRequest {
    pub capacity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListPendingParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListPendingResponse {
    pub data: Vec<Application>,
}

/// Capacity pool and queue statistics.
///
/// GET /api/v1/admin/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<AdminStatsResponse>, ApiError> {
    let pool_state = CapacityRepository::new(state.pool.clone()).status().await?;
    let pending_count = ApplicationRepository::new(state.pool.clone())
        .count_pending()
        .await?;

    Ok(Json(AdminStatsResponse {
        capacity: pool_state.capacity,
        approved_count: pool_state.approved_count,
        spots_remaining: pool_state.spots_remaining(),
        pending_count,
    }))
}

/// List pending applications in queue order.
///
/// GET /api/v1/admin/applications
pub async fn list_pending(
    State(state): State<AppState>,
    Query(params): Query<ListPendingParams>,
) -> Result<Json<ListPendingResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = ApplicationRepository::new(state.pool.clone())
        .list_pending(limit, offset)
        .await?;

    Ok(Json(ListPendingResponse {
        data: rows.into_iter().map(Application::from).collect(),
    }))
}

/// Manually approve one application (bypasses the score threshold).
///
/// POST /api/v1/admin/applications/:id/approve
pub async fn approve_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ManualApprovalResponse>, ApiError> {
    let app = ApplicationRepository::new(state.pool.clone())
        .find_by_id(application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    let status: ApplicationStatus = app.status.into();
    if status != ApplicationStatus::Pending {
        return Err(ApiError::Conflict(format!("Application is {}", status)));
    }

    match state
        .admission
        .approve(app.id, &app.email, Some(&app.display_name))
        .await
        .map_err(ApiError::from)?
    {
        ApproveOutcome::Approved {
            profile_id,
            granted_invites,
            spots_remaining,
        } => Ok(Json(ManualApprovalResponse {
            application_id: app.id,
            profile_id,
            granted_invites,
            spots_remaining,
        })),
        ApproveOutcome::AtCapacity => Err(ApiError::AtCapacity),
        ApproveOutcome::AlreadyDecided => {
            Err(ApiError::Conflict("Application already decided".to_string()))
        }
    }
}

/// Bulk approval with per-application outcomes.
///
/// POST /api/v1/admin/applications/approve
pub async fn bulk_approve(
    State(state): State<AppState>,
    Json(request): Json<BulkApproveRequest>,
) -> Result<Json<BulkApproveResponse>, ApiError> {
    if request.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".to_string()));
    }
    if request.ids.len() > MAX_BULK_IDS {
        return Err(ApiError::Validation(format!(
            "ids must contain at most {} entries",
            MAX_BULK_IDS
        )));
    }

    let applications = ApplicationRepository::new(state.pool.clone());
    let mut results = Vec::with_capacity(request.ids.len());

    for id in request.ids {
        let outcome = match applications.find_by_id(id).await? {
            None => "not_found".to_string(),
            Some(app) => {
                let status: ApplicationStatus = app.status.into();
                if status != ApplicationStatus::Pending {
                    "not_pending".to_string()
                } else {
                    match state
                        .admission
                        .approve(app.id, &app.email, Some(&app.display_name))
                        .await
                    {
                        Ok(ApproveOutcome::Approved { .. }) => "approved".to_string(),
                        Ok(ApproveOutcome::AtCapacity) => "at_capacity".to_string(),
                        Ok(ApproveOutcome::AlreadyDecided) => "not_pending".to_string(),
                        Err(err) => {
                            tracing::error!(application_id = %id, error = %err, "Bulk approval failed");
                            "error".to_string()
                        }
                    }
                }
            }
        };
        results.push(BulkApprovalOutcome {
            application_id: id,
            outcome,
        });
    }

    Ok(Json(BulkApproveResponse { results }))
}

/// Reject a pending application with a reason.
///
/// POST /api/v1/admin/applications/:id/reject
pub async fn reject_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<RejectApplicationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    request.validate()?;

    let applications = ApplicationRepository::new(state.pool.clone());
    let app = applications
        .find_by_id(application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    let status: ApplicationStatus = app.status.into();
    if status != ApplicationStatus::Pending {
        return Err(ApiError::Conflict(format!("Application is {}", status)));
    }

    state
        .admission
        .reject(application_id, &request.reason)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(serde_json::json!({ "status": "rejected" })))
}

/// Adjust the capacity pool.
///
/// PUT /api/v1/admin/capacity
///
/// Never below the current approved count; the pool invariant holds.
pub async fn set_capacity(
    State(state): State<AppState>,
    Json(request): Json<SetCapacityRequest>,
) -> Result<Json<CapacityStatusResponse>, ApiError> {
    if request.capacity < 0 {
        return Err(ApiError::Validation("capacity cannot be negative".to_string()));
    }

    let updated = CapacityRepository::new(state.pool.clone())
        .set_capacity(request.capacity)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("Capacity cannot be set below the approved count".to_string())
        })?;

    tracing::info!(capacity = updated.capacity, "Capacity adjusted");

    let status: PoolStatus = updated.into();
    Ok(Json(status.into()))
}
