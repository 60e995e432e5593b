//! Referral domain models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One row of the referral leaderboard.
///
/// Rank is by referral count descending, ties broken by earliest referral.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub referrer_id: Uuid,
    pub display_name: String,
    pub referral_count: i64,
    pub first_referral_at: DateTime<Utc>,
}

/// Response for the referral leaderboard endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LeaderboardResponse {
    pub data: Vec<LeaderboardEntry>,
}

/// Generate a referral code (10 chars, unambiguous alphabet).
///
/// Referral codes are a separate namespace from invite codes: every
/// application gets one at submission so pending applicants can recruit.
pub fn generate_referral_code() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();

    (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
