//! Referral ledger: edge recording, counts, leaderboard.

use domain::models::referral::LeaderboardEntry;
use persistence::repositories::{ApplicationRepository, ReferralRepository};
use shared::validation::normalize_code;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

/// Records referrer→referee edges and serves the aggregates used by the
/// queue boost and the leaderboard.
#[derive(Clone)]
pub struct ReferralService {
    applications: ApplicationRepository,
    referrals: ReferralRepository,
}

impl ReferralService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            applications: ApplicationRepository::new(pool.clone()),
            referrals: ReferralRepository::new(pool),
        }
    }

    /// Resolve a referral code to its owner and append the edge.
    ///
    /// Idempotent per (referrer, referee); self-referrals and unknown
    /// codes are ignored. Returns whether a new edge was recorded.
    pub async fn record(&self, referrer_code: &str, referee_id: Uuid) -> Result<bool, sqlx::Error> {
        let code = normalize_code(referrer_code);
        let Some(referrer) = self.applications.find_by_referral_code(&code).await? else {
            debug!(referral_code = %code, "Unknown referral code");
            return Ok(false);
        };
        if referrer.id == referee_id {
            debug!(application_id = %referee_id, "Ignoring self-referral");
            return Ok(false);
        }

        let recorded = self.referrals.record_edge(referrer.id, referee_id).await?;
        if recorded {
            info!(
                referrer_id = %referrer.id,
                referee_id = %referee_id,
                "Referral recorded"
            );
        }
        Ok(recorded)
    }

    /// Referral count for an application (the queue boost term).
    pub async fn count_for(&self, referrer_id: Uuid) -> Result<i64, sqlx::Error> {
        self.referrals.count_for(referrer_id).await
    }

    /// Leaderboard page: count descending, ties broken by earliest
    /// referral.
    pub async fn leaderboard(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        let rows = self.referrals.leaderboard(limit, offset).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                rank: offset + i as i64 + 1,
                referrer_id: row.referrer_id,
                display_name: row.display_name,
                referral_count: row.referral_count,
                first_referral_at: row.first_referral_at,
            })
            .collect())
    }
}
