//! Profile repository for database operations.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::entities::ProfileEntity;
use crate::metrics::QueryTimer;

const PROFILE_COLUMNS: &str =
    "id, email, display_name, beta_access, invite_quota, invites_used, created_at, updated_at";

/// Repository for profile-related database operations.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Creates a new ProfileRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find profile by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ProfileEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_profile_by_id");
        let result = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find profile by normalized email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<ProfileEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_profile_by_email");
        let result = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE email = $1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lock the profile row for an email within the caller's transaction.
    ///
    /// Redemption uses this so two concurrent redemptions for the same
    /// redeemer serialize: the second waits, then sees `beta_access = true`
    /// and takes the idempotent path without consuming anything.
    pub async fn lock_by_email<'e, E>(
        &self,
        executor: E,
        email: &str,
    ) -> Result<Option<ProfileEntity>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("lock_profile_by_email");
        let result = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE email = $1
            FOR UPDATE
            "#
        ))
        .bind(email)
        .fetch_optional(executor)
        .await;
        timer.record();
        result
    }

    /// Idempotent activation upsert keyed by email.
    ///
    /// Grants beta access, keeps any existing display name, and never
    /// shrinks an already-granted invite quota.
    pub async fn activate<'e, E>(
        &self,
        executor: E,
        email: &str,
        display_name: Option<&str>,
        invite_quota: i32,
    ) -> Result<ProfileEntity, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("activate_profile");
        let result = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            INSERT INTO profiles (email, display_name, beta_access, invite_quota)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (email) DO UPDATE SET
                beta_access = TRUE,
                display_name = COALESCE(profiles.display_name, EXCLUDED.display_name),
                invite_quota = GREATEST(profiles.invite_quota, EXCLUDED.invite_quota),
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(display_name)
        .bind(invite_quota)
        .fetch_one(executor)
        .await;
        timer.record();
        result
    }

    /// Atomically claim one unit of invite quota.
    ///
    /// Returns the updated profile, or `None` when the quota is exhausted;
    /// the conditional UPDATE is what keeps `invites_used <= invite_quota`
    /// under concurrent issuance.
    pub async fn claim_invite_quota<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
    ) -> Result<Option<ProfileEntity>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("claim_invite_quota");
        let result = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            UPDATE profiles
            SET invites_used = invites_used + 1, updated_at = NOW()
            WHERE id = $1 AND invites_used < invite_quota
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .fetch_optional(executor)
        .await;
        timer.record();
        result
    }
}
