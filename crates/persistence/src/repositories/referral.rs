//! Referral edge repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::LeaderboardRowEntity;
use crate::metrics::QueryTimer;

/// Repository for the append-only referral graph.
#[derive(Clone)]
pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    /// Creates a new ReferralRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a referral edge.
    ///
    /// Idempotent per (referrer, referee): recording the same edge twice
    /// is a no-op and returns false.
    pub async fn record_edge(
        &self,
        referrer_id: Uuid,
        referee_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("record_referral_edge");
        let result = sqlx::query(
            r#"
            INSERT INTO referral_edges (referrer_id, referee_id)
            VALUES ($1, $2)
            ON CONFLICT (referrer_id, referee_id) DO NOTHING
            "#,
        )
        .bind(referrer_id)
        .bind(referee_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Number of referees recorded for a referrer.
    pub async fn count_for(&self, referrer_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_referrals");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM referral_edges WHERE referrer_id = $1
            "#,
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Leaderboard page: referrers by count descending, ties broken by the
    /// earliest recorded referral.
    pub async fn leaderboard(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardRowEntity>, sqlx::Error> {
        let timer = QueryTimer::new("referral_leaderboard");
        let result = sqlx::query_as::<_, LeaderboardRowEntity>(
            r#"
            SELECT
                a.id AS referrer_id,
                a.display_name,
                COUNT(*) AS referral_count,
                MIN(e.created_at) AS first_referral_at
            FROM referral_edges e
            JOIN applications a ON a.id = e.referrer_id
            GROUP BY a.id, a.display_name
            ORDER BY referral_count DESC, first_referral_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
