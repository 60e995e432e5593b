//! Referral edge entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the referral_edges table.
#[derive(Debug, Clone, FromRow)]
pub struct ReferralEdgeEntity {
    pub referrer_id: Uuid,
    pub referee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Aggregated leaderboard row (referrer joined with its application).
#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRowEntity {
    pub referrer_id: Uuid,
    pub display_name: String,
    pub referral_count: i64,
    pub first_referral_at: DateTime<Utc>,
}
