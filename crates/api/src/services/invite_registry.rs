//! Invite code lifecycle: issuance, redemption, revocation.
//!
//! Redemption is the delicate path: the use-increment and the capacity
//! reservation run in one transaction, so two concurrent redeemers of a
//! nearly-exhausted code (or a nearly-full pool) can never both succeed.

use chrono::{DateTime, Duration, Utc};
use domain::models::invite_code::{generate_invite_code, is_invite_code_format};
use persistence::entities::InviteCodeEntity;
use persistence::repositories::{
    ApplicationRepository, CapacityRepository, InviteCodeRepository, ProfileRepository,
};
use shared::validation::{normalize_code, normalize_email};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::metrics::{
    record_application_approved, record_capacity_denial, record_invite_redeemed,
};

/// Errors that can occur during invite code operations.
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("Invite code not found, inactive, or expired")]
    InvalidCode,

    #[error("Invite code has no remaining uses")]
    CodeExhausted,

    #[error("The beta program is at capacity")]
    AtCapacity,

    #[error("No invite quota remaining")]
    QuotaExhausted,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Profile does not have beta access")]
    NotEligible,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redemption task failed: {0}")]
    Task(String),
}

impl From<InviteError> for ApiError {
    fn from(err: InviteError) -> Self {
        match err {
            InviteError::InvalidCode => ApiError::InvalidCode,
            InviteError::CodeExhausted => ApiError::CodeExhausted,
            InviteError::AtCapacity => ApiError::AtCapacity,
            InviteError::QuotaExhausted => ApiError::QuotaExhausted,
            InviteError::ProfileNotFound => ApiError::NotFound("Profile not found".into()),
            InviteError::NotEligible => {
                ApiError::Forbidden("Profile does not have beta access".into())
            }
            InviteError::Database(e) => e.into(),
            InviteError::Task(msg) => ApiError::Internal(msg),
        }
    }
}

/// Issuance settings.
#[derive(Debug, Clone, Copy)]
pub struct InviteSettings {
    pub max_uses: i32,
    pub expiry_days: i64,
}

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub code: String,
    pub max_uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub invites_used: i32,
    pub invite_quota: i32,
}

/// Result of a successful redemption.
#[derive(Debug, Clone)]
pub struct RedeemOutcome {
    pub already_approved: bool,
    pub profile_id: Uuid,
    pub spots_remaining: i32,
}

/// Owns the invite code lifecycle.
#[derive(Clone)]
pub struct InviteCodeRegistry {
    pool: PgPool,
    applications: ApplicationRepository,
    profiles: ProfileRepository,
    invites: InviteCodeRepository,
    capacity: CapacityRepository,
    settings: InviteSettings,
}

impl InviteCodeRegistry {
    pub fn new(pool: PgPool, settings: InviteSettings) -> Self {
        Self {
            applications: ApplicationRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            invites: InviteCodeRepository::new(pool.clone()),
            capacity: CapacityRepository::new(pool.clone()),
            pool,
            settings,
        }
    }

    /// Issue a new invite code for an approved owner.
    ///
    /// The quota claim and the code insert commit together; concurrent
    /// issuance serializes on the owner's profile row, so `invites_used`
    /// can never pass `invite_quota`.
    pub async fn issue(&self, owner_id: Uuid) -> Result<IssuedInvite, InviteError> {
        let owner = self
            .profiles
            .find_by_id(owner_id)
            .await?
            .ok_or(InviteError::ProfileNotFound)?;
        if !owner.beta_access {
            return Err(InviteError::NotEligible);
        }

        let code = self.invites.generate_unique_code(generate_invite_code).await?;
        let expires_at = Utc::now() + Duration::days(self.settings.expiry_days);

        let mut tx = self.pool.begin().await?;
        let Some(owner) = self.profiles.claim_invite_quota(&mut *tx, owner_id).await? else {
            tx.rollback().await?;
            return Err(InviteError::QuotaExhausted);
        };
        let created = self
            .invites
            .create(
                &mut *tx,
                &code,
                owner_id,
                self.settings.max_uses,
                Some(expires_at),
            )
            .await?;
        tx.commit().await?;

        info!(
            owner_id = %owner_id,
            code = %created.code,
            invites_used = owner.invites_used,
            "Invite code issued"
        );

        Ok(IssuedInvite {
            code: created.code,
            max_uses: created.max_uses,
            expires_at: created.expires_at,
            invites_used: owner.invites_used,
            invite_quota: owner.invite_quota,
        })
    }

    /// Redeem an invite code for the given redeemer.
    ///
    /// Idempotent for an already-approved redeemer: succeeds without
    /// consuming a use or a capacity slot.
    pub async fn redeem(
        &self,
        raw_code: &str,
        raw_email: &str,
        display_name: Option<&str>,
    ) -> Result<RedeemOutcome, InviteError> {
        let code = normalize_code(raw_code);
        let email = normalize_email(raw_email);

        if !is_invite_code_format(&code) {
            return Err(InviteError::InvalidCode);
        }

        // Precheck for precise error mapping; the transaction below
        // re-verifies every condition atomically.
        let existing = self
            .invites
            .find_by_code(&code)
            .await?
            .ok_or(InviteError::InvalidCode)?;
        let now = Utc::now();
        if !existing.is_active || existing.expires_at.map_or(false, |exp| exp <= now) {
            return Err(InviteError::InvalidCode);
        }
        if existing.uses >= existing.max_uses {
            return Err(InviteError::CodeExhausted);
        }

        // The transaction is driven to completion on a separate task: a
        // client that disconnects mid-request must not abandon a
        // half-applied redemption.
        let this = self.clone();
        let display_name = display_name.map(|s| s.to_string());
        tokio::spawn(async move { this.redeem_tx(code, email, display_name).await })
            .await
            .map_err(|e| InviteError::Task(e.to_string()))?
    }

    async fn redeem_tx(
        &self,
        code: String,
        email: String,
        display_name: Option<String>,
    ) -> Result<RedeemOutcome, InviteError> {
        let mut tx = self.pool.begin().await?;

        // Idempotence: the row lock serializes concurrent redemptions for
        // the same redeemer; whoever arrives second sees beta_access and
        // consumes nothing.
        if let Some(profile) = self.profiles.lock_by_email(&mut *tx, &email).await? {
            if profile.beta_access {
                tx.rollback().await?;
                let status = self.capacity.status().await?;
                return Ok(RedeemOutcome {
                    already_approved: true,
                    profile_id: profile.id,
                    spots_remaining: status.spots_remaining(),
                });
            }
        }

        let Some(code_row) = self.invites.consume_use(&mut *tx, &code).await? else {
            tx.rollback().await?;
            return Err(InviteError::CodeExhausted);
        };

        // Same atomic unit as the use-increment: a full pool rolls the
        // use back, so a use is never burned without a seat.
        let Some(pool_state) = self.capacity.reserve_slot(&mut *tx).await? else {
            tx.rollback().await?;
            record_capacity_denial();
            return Err(InviteError::AtCapacity);
        };

        let profile = self
            .profiles
            .activate(&mut *tx, &email, display_name.as_deref(), 0)
            .await?;
        self.applications
            .mark_approved_by_email(&mut *tx, &email)
            .await?;
        tx.commit().await?;

        record_invite_redeemed();
        record_application_approved();
        info!(
            code = %code_row.code,
            profile_id = %profile.id,
            uses = code_row.uses,
            "Invite code redeemed"
        );

        Ok(RedeemOutcome {
            already_approved: false,
            profile_id: profile.id,
            spots_remaining: pool_state.spots_remaining(),
        })
    }

    /// Revoke one of the owner's codes. Already-consumed uses keep their
    /// effects.
    pub async fn revoke(&self, owner_id: Uuid, raw_code: &str) -> Result<(), InviteError> {
        let code = normalize_code(raw_code);
        let rows = self.invites.revoke(owner_id, &code).await?;
        if rows == 0 {
            return Err(InviteError::InvalidCode);
        }
        info!(owner_id = %owner_id, code = %code, "Invite code revoked");
        Ok(())
    }

    /// List the owner's live codes.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<InviteCodeEntity>, InviteError> {
        self.profiles
            .find_by_id(owner_id)
            .await?
            .ok_or(InviteError::ProfileNotFound)?;
        Ok(self.invites.list_active_for_owner(owner_id).await?)
    }

    /// Look up a code for the public validity preview.
    pub async fn preview(&self, raw_code: &str) -> Result<Option<InviteCodeEntity>, InviteError> {
        let code = normalize_code(raw_code);
        Ok(self.invites.find_by_code(&code).await?)
    }
}
