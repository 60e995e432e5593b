//! Referral leaderboard routes.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::referral::LeaderboardResponse;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Referral leaderboard page.
///
/// GET /api/v1/beta/referrals/leaderboard
///
/// Ranked by referral count descending; ties go to the earliest referral.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let data = state.referrals.leaderboard(limit, offset).await?;
    Ok(Json(LeaderboardResponse { data }))
}
