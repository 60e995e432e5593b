//! Invite code repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::entities::InviteCodeEntity;
use crate::metrics::QueryTimer;

const INVITE_COLUMNS: &str =
    "id, code, owner_id, max_uses, uses, is_active, expires_at, created_at";

/// Repository for invite-code-related database operations.
#[derive(Clone)]
pub struct InviteCodeRepository {
    pool: PgPool,
}

impl InviteCodeRepository {
    /// Creates a new InviteCodeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new invite code.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        code: &str,
        owner_id: Uuid,
        max_uses: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<InviteCodeEntity, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("create_invite_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            r#"
            INSERT INTO invite_codes (code, owner_id, max_uses, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(owner_id)
        .bind(max_uses)
        .bind(expires_at)
        .fetch_one(executor)
        .await;
        timer.record();
        result
    }

    /// Find invite code by its normalized code string.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_invite_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM invite_codes
            WHERE code = $1
            "#
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Atomically consume one use of a code.
    ///
    /// The conditional UPDATE checks active/unexpired/unexhausted in the
    /// same statement that increments, and the row lock it takes
    /// serializes concurrent redeemers of the same code. Returns `None`
    /// when no use could be consumed.
    pub async fn consume_use<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<InviteCodeEntity>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("consume_invite_code_use");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            r#"
            UPDATE invite_codes
            SET uses = uses + 1
            WHERE code = $1
              AND is_active
              AND uses < max_uses
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(code)
        .fetch_optional(executor)
        .await;
        timer.record();
        result
    }

    /// List an owner's live codes (active, unexpired, not fully used).
    pub async fn list_active_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_invite_codes");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM invite_codes
            WHERE owner_id = $1
              AND is_active
              AND uses < max_uses
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Revoke (soft deactivate) an owner's code. Consumed uses keep their
    /// effects; the code simply stops being redeemable.
    pub async fn revoke(&self, owner_id: Uuid, code: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("revoke_invite_code");
        let result = sqlx::query(
            r#"
            UPDATE invite_codes
            SET is_active = FALSE
            WHERE code = $1 AND owner_id = $2 AND is_active
            "#,
        )
        .bind(code)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Check if a code string is already taken.
    pub async fn code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("check_invite_code_exists");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM invite_codes WHERE code = $1)
            "#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Generate a unique invite code by retrying on collision.
    pub async fn generate_unique_code<F>(&self, generator: F) -> Result<String, sqlx::Error>
    where
        F: Fn() -> String,
    {
        let mut code = generator();
        let mut attempts = 0;

        while self.code_exists(&code).await? {
            code = generator();
            attempts += 1;
            if attempts > 100 {
                return Err(sqlx::Error::Protocol(
                    "Could not generate unique invite code".to_string(),
                ));
            }
        }

        Ok(code)
    }
}
