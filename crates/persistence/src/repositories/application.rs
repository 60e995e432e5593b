//! Application repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::entities::ApplicationEntity;
use crate::metrics::QueryTimer;

const APPLICATION_COLUMNS: &str = "id, email, display_name, answers, score, status, \
     referral_code, rejection_reason, submitted_at, approved_at";

/// Repository for application-related database operations.
#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    /// Creates a new ApplicationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a new pending application or refreshes the live one for
    /// this email (latest answers and score win).
    ///
    /// The conflict target is the partial unique index on non-rejected
    /// emails, so rejected applications never block a fresh submission.
    /// The original `submitted_at` and `referral_code` are retained on
    /// re-submission, and an already-approved row is left untouched
    /// (`None` is returned in that case).
    pub async fn upsert_pending(
        &self,
        email: &str,
        display_name: &str,
        answers: &serde_json::Value,
        score: i32,
        referral_code: &str,
    ) -> Result<Option<ApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("upsert_pending_application");
        let result = sqlx::query_as::<_, ApplicationEntity>(&format!(
            r#"
            INSERT INTO applications (email, display_name, answers, score, referral_code)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) WHERE status <> 'rejected' DO UPDATE SET
                display_name = EXCLUDED.display_name,
                answers = EXCLUDED.answers,
                score = EXCLUDED.score
            WHERE applications.status = 'pending'
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(display_name)
        .bind(answers)
        .bind(score)
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find application by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_application_by_id");
        let result = sqlx::query_as::<_, ApplicationEntity>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the live (non-rejected) application for an email.
    pub async fn find_live_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_live_application_by_email");
        let result = sqlx::query_as::<_, ApplicationEntity>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE email = $1 AND status <> 'rejected'
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find application by its referral code.
    pub async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<ApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_application_by_referral_code");
        let result = sqlx::query_as::<_, ApplicationEntity>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE referral_code = $1
            "#
        ))
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Transition a pending application to approved.
    ///
    /// Returns false when the application was not pending (already
    /// approved or rejected); callers treat that as a no-op.
    pub async fn mark_approved<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("mark_application_approved");
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET status = 'approved', approved_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Approve the pending application for an email, if one exists.
    ///
    /// Used by invite redemption, where the redeemer may or may not have
    /// an application on file.
    pub async fn mark_approved_by_email<'e, E>(
        &self,
        executor: E,
        email: &str,
    ) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("mark_application_approved_by_email");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE applications
            SET status = 'approved', approved_at = NOW()
            WHERE email = $1 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await;
        timer.record();
        result
    }

    /// Transition a pending application to rejected with a reason.
    pub async fn mark_rejected(&self, id: Uuid, reason: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_application_rejected");
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET status = 'rejected', rejection_reason = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Number of pending applications.
    pub async fn count_pending(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_pending_applications");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM applications WHERE status = 'pending'
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Number of pending applications strictly ahead of the given rank key
    /// in queue order (score DESC, submitted_at ASC, id ASC).
    pub async fn count_ahead(
        &self,
        score: i32,
        submitted_at: DateTime<Utc>,
        id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_applications_ahead");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM applications
            WHERE status = 'pending'
              AND (score > $1
                   OR (score = $1 AND submitted_at < $2)
                   OR (score = $1 AND submitted_at = $2 AND id < $3))
            "#,
        )
        .bind(score)
        .bind(submitted_at)
        .bind(id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List pending applications in queue order (admin view).
    pub async fn list_pending(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_pending_applications");
        let result = sqlx::query_as::<_, ApplicationEntity>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE status = 'pending'
            ORDER BY score DESC, submitted_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Check if a referral code is already taken.
    pub async fn referral_code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("check_referral_code_exists");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM applications WHERE referral_code = $1)
            "#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Generate a unique referral code by retrying on collision.
    pub async fn generate_unique_referral_code<F>(
        &self,
        generator: F,
    ) -> Result<String, sqlx::Error>
    where
        F: Fn() -> String,
    {
        let mut code = generator();
        let mut attempts = 0;

        while self.referral_code_exists(&code).await? {
            code = generator();
            attempts += 1;
            if attempts > 100 {
                return Err(sqlx::Error::Protocol(
                    "Could not generate unique referral code".to_string(),
                ));
            }
        }

        Ok(code)
    }
}
