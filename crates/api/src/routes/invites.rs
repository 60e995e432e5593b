//! Invite code routes: redemption, preview, and owner-scoped management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::invite_code::{
    InviteSummary, IssueInviteResponse, ListInvitesResponse, PublicInviteInfo,
    RedeemInviteRequest, RedeemInviteResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Redeem an invite code.
///
/// POST /api/v1/beta/invites/redeem
///
/// Succeeds idempotently for an already-approved redeemer.
pub async fn redeem_invite(
    State(state): State<AppState>,
    Json(request): Json<RedeemInviteRequest>,
) -> Result<Json<RedeemInviteResponse>, ApiError> {
    request.validate()?;

    let outcome = state
        .invites
        .redeem(&request.code, &request.email, request.display_name.as_deref())
        .await?;

    Ok(Json(RedeemInviteResponse {
        already_approved: outcome.already_approved,
        profile_id: outcome.profile_id,
        spots_remaining: outcome.spots_remaining,
    }))
}

/// Public invite code preview (no auth, nothing consumed).
///
/// GET /api/v1/beta/invites/:code
pub async fn get_invite_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PublicInviteInfo>, ApiError> {
    let invite = state
        .invites
        .preview(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invite not found".to_string()))?;

    Ok(Json(PublicInviteInfo {
        is_valid: invite.is_redeemable(Utc::now()),
        uses_remaining: (invite.max_uses - invite.uses).max(0),
        expires_at: invite.expires_at,
    }))
}

/// Issue a new invite code from a profile's quota.
///
/// POST /api/v1/beta/profiles/:profile_id/invites
pub async fn issue_invite(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<(StatusCode, Json<IssueInviteResponse>), ApiError> {
    let issued = state.invites.issue(profile_id).await?;

    let invite_url = format!(
        "{}/join/{}",
        state.config.server.app_base_url.trim_end_matches('/'),
        issued.code
    );

    Ok((
        StatusCode::CREATED,
        Json(IssueInviteResponse {
            code: issued.code,
            max_uses: issued.max_uses,
            expires_at: issued.expires_at,
            invites_used: issued.invites_used,
            invite_quota: issued.invite_quota,
            invite_url,
        }),
    ))
}

/// List a profile's live invite codes.
///
/// GET /api/v1/beta/profiles/:profile_id/invites
pub async fn list_invites(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<ListInvitesResponse>, ApiError> {
    let invites = state.invites.list(profile_id).await?;

    let data = invites
        .into_iter()
        .map(|i| InviteSummary {
            code: i.code,
            max_uses: i.max_uses,
            uses: i.uses,
            expires_at: i.expires_at,
            created_at: i.created_at,
        })
        .collect();

    Ok(Json(ListInvitesResponse { data }))
}

/// Revoke one of a profile's invite codes.
///
/// DELETE /api/v1/beta/profiles/:profile_id/invites/:code
pub async fn revoke_invite(
    State(state): State<AppState>,
    Path((profile_id, code)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    state.invites.revoke(profile_id, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}
