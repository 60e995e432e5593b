//! Queue position domain models.

use serde::Serialize;
use uuid::Uuid;

/// Ranking of a pending application within the queue.
///
/// `position` is the raw rank (1-based); `effective_position` folds in the
/// referral boost and is what the ETA is computed from. Positions are
/// eventually consistent snapshots, not reservations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct QueuePosition {
    pub application_id: Uuid,
    pub position: i64,
    pub total_pending: i64,
    pub ahead_count: i64,
    pub behind_count: i64,
    pub referral_count: i64,
    pub effective_position: i64,
    pub eta_days: i64,
}
