//! Admission decision orchestration.
//!
//! `evaluate` is the single entry point for submissions: it scores the
//! answers, tries the invite path, then the score path, and otherwise
//! queues the applicant. Every path that consumes capacity goes through
//! the capacity ledger's atomic reservation; a reservation whose side
//! effects fail is released, never silently kept.

use chrono::{Duration, Utc};
use domain::models::application::{ApplicationStatus, SubmitApplicationRequest};
use domain::models::invite_code::generate_invite_code;
use domain::models::referral::generate_referral_code;
use domain::services::scoring::{Score, ScoringEngine};
use persistence::entities::ApplicationEntity;
use persistence::repositories::{
    ApplicationRepository, CapacityRepository, InviteCodeRepository, ProfileRepository,
};
use shared::validation::normalize_email;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::metrics::{
    record_application_approved, record_application_submitted, record_capacity_denial,
};
use crate::services::invite_registry::{InviteCodeRegistry, InviteError};
use crate::services::referrals::ReferralService;

/// Errors that can occur while evaluating an admission.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not serialize answers: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Application already decided")]
    AlreadyDecided,

    #[error("Approval task failed: {0}")]
    Task(String),
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Database(e) => e.into(),
            AdmissionError::Serialization(e) => ApiError::Internal(e.to_string()),
            AdmissionError::AlreadyDecided => {
                ApiError::Conflict("Application already decided".into())
            }
            AdmissionError::Task(msg) => ApiError::Internal(msg),
        }
    }
}

/// Admission knobs, sourced from config once at startup.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionSettings {
    /// The single authoritative auto-approval threshold.
    pub auto_approve_threshold: u32,
    pub invite_grant_count: i32,
    pub invite_max_uses: i32,
    pub invite_expiry_days: i64,
}

/// Outcome of evaluating a submission.
#[derive(Debug, Clone)]
pub enum Decision {
    Approved {
        /// True when the applicant already had beta access; nothing was
        /// consumed by this call.
        already_approved: bool,
        profile_id: Uuid,
        granted_invites: Vec<String>,
        spots_remaining: i32,
    },
    Pending {
        application_id: Uuid,
        referral_code: String,
        /// True when the applicant qualified but the pool was full.
        at_capacity: bool,
    },
}

/// Evaluation result: the computed score plus the decision.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: Score,
    pub decision: Decision,
}

/// Result of the capacity-gated approval unit.
#[derive(Debug, Clone)]
pub enum ApproveOutcome {
    Approved {
        profile_id: Uuid,
        granted_invites: Vec<String>,
        spots_remaining: i32,
    },
    /// The pool was full; nothing was consumed.
    AtCapacity,
    /// Another caller decided this application concurrently; the slot
    /// reserved here was released.
    AlreadyDecided,
}

/// Orchestrates approve/queue decisions over the shared capacity ledger.
#[derive(Clone)]
pub struct AdmissionService {
    pool: PgPool,
    scoring: ScoringEngine,
    applications: ApplicationRepository,
    profiles: ProfileRepository,
    invites: InviteCodeRepository,
    capacity: CapacityRepository,
    registry: InviteCodeRegistry,
    referrals: ReferralService,
    settings: AdmissionSettings,
}

impl AdmissionService {
    pub fn new(
        pool: PgPool,
        scoring: ScoringEngine,
        registry: InviteCodeRegistry,
        referrals: ReferralService,
        settings: AdmissionSettings,
    ) -> Self {
        Self {
            applications: ApplicationRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            invites: InviteCodeRepository::new(pool.clone()),
            capacity: CapacityRepository::new(pool.clone()),
            pool,
            scoring,
            registry,
            referrals,
            settings,
        }
    }

    /// Evaluate a validated submission.
    pub async fn evaluate(
        &self,
        req: &SubmitApplicationRequest,
    ) -> Result<Evaluation, AdmissionError> {
        let email = normalize_email(&req.email);
        let score = self.scoring.score(&req.answers, req.referral_code.is_some());
        record_application_submitted();

        // An applicant who already has beta access gets an idempotent
        // success; no capacity, uses, or rows are touched.
        if let Some(profile) = self.profiles.find_by_email(&email).await? {
            if profile.beta_access {
                let status = self.capacity.status().await?;
                return Ok(Evaluation {
                    score,
                    decision: Decision::Approved {
                        already_approved: true,
                        profile_id: profile.id,
                        granted_invites: vec![],
                        spots_remaining: status.spots_remaining(),
                    },
                });
            }
        }

        // Create or refresh the application row. Latest answers and score
        // win; the original submitted_at and referral code keep their
        // queue slot.
        let referral_code = self
            .applications
            .generate_unique_referral_code(generate_referral_code)
            .await?;
        let answers = serde_json::to_value(&req.answers)?;
        let Some(app) = self
            .applications
            .upsert_pending(
                &email,
                &req.display_name,
                &answers,
                score.capped as i32,
                &referral_code,
            )
            .await?
        else {
            // The live application is already approved; repair the profile
            // idempotently and report success.
            let profile = self
                .profiles
                .activate(self.pool(), &email, Some(&req.display_name), 0)
                .await?;
            let status = self.capacity.status().await?;
            return Ok(Evaluation {
                score,
                decision: Decision::Approved {
                    already_approved: true,
                    profile_id: profile.id,
                    granted_invites: vec![],
                    spots_remaining: status.spots_remaining(),
                },
            });
        };

        // Referral edges are recorded at submission time, idempotently per
        // (referrer, referee). A bad code is not a submission failure.
        if let Some(code) = &req.referral_code {
            if let Err(err) = self.referrals.record(code, app.id).await {
                warn!(application_id = %app.id, error = %err, "Failed to record referral edge");
            }
        }

        // Abuse signals force the queue path. Auto-approval must never
        // fire when abuse is suspected, regardless of score.
        if req.honeypot_triggered {
            warn!(application_id = %app.id, "Honeypot triggered, forcing pending");
            return Ok(Self::pending(score, &app, false));
        }

        // Invite path: bypasses the score threshold, not the capacity
        // check. An unusable code falls through to the score path.
        if let Some(code) = &req.invite_code {
            match self.registry.redeem(code, &email, Some(&req.display_name)).await {
                Ok(outcome) => {
                    return Ok(Evaluation {
                        score,
                        decision: Decision::Approved {
                            already_approved: outcome.already_approved,
                            profile_id: outcome.profile_id,
                            granted_invites: vec![],
                            spots_remaining: outcome.spots_remaining,
                        },
                    });
                }
                Err(InviteError::AtCapacity) => {
                    return Ok(Self::pending(score, &app, true));
                }
                Err(InviteError::InvalidCode) | Err(InviteError::CodeExhausted) => {
                    info!(
                        application_id = %app.id,
                        "Invite code unusable, falling back to score path"
                    );
                }
                Err(InviteError::Database(e)) => return Err(e.into()),
                Err(InviteError::Task(msg)) => return Err(AdmissionError::Task(msg)),
                Err(other) => {
                    info!(application_id = %app.id, error = %other, "Invite redemption refused");
                }
            }
        }

        // Score path.
        if score.capped >= self.settings.auto_approve_threshold {
            match self
                .approve(app.id, &email, Some(&req.display_name))
                .await?
            {
                ApproveOutcome::Approved {
                    profile_id,
                    granted_invites,
                    spots_remaining,
                } => {
                    return Ok(Evaluation {
                        score,
                        decision: Decision::Approved {
                            already_approved: false,
                            profile_id,
                            granted_invites,
                            spots_remaining,
                        },
                    });
                }
                ApproveOutcome::AtCapacity => {
                    return Ok(Self::pending(score, &app, true));
                }
                ApproveOutcome::AlreadyDecided => {
                    // A concurrent caller decided this application; only
                    // an approval may be reported as success.
                    let current = self
                        .applications
                        .find_by_id(app.id)
                        .await?
                        .ok_or(AdmissionError::AlreadyDecided)?;
                    let current_status: ApplicationStatus = current.status.into();
                    if current_status != ApplicationStatus::Approved {
                        return Err(AdmissionError::AlreadyDecided);
                    }
                    let profile = self
                        .profiles
                        .activate(self.pool(), &email, Some(&req.display_name), 0)
                        .await?;
                    let status = self.capacity.status().await?;
                    return Ok(Evaluation {
                        score,
                        decision: Decision::Approved {
                            already_approved: true,
                            profile_id: profile.id,
                            granted_invites: vec![],
                            spots_remaining: status.spots_remaining(),
                        },
                    });
                }
            }
        }

        Ok(Self::pending(score, &app, false))
    }

    /// The capacity-gated approval unit, shared by auto-approval and the
    /// admin override (which bypasses the threshold, never this check).
    ///
    /// Reserves a slot first, then runs the side effects (status flip,
    /// profile activation, invite grants) in one transaction on a task
    /// that survives client disconnects. A failed transaction releases
    /// the reserved slot.
    pub async fn approve(
        &self,
        application_id: Uuid,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<ApproveOutcome, AdmissionError> {
        let Some(pool_state) = self.capacity.reserve_slot(self.capacity.pool()).await? else {
            record_capacity_denial();
            return Ok(ApproveOutcome::AtCapacity);
        };

        let this = self.clone();
        let email = email.to_string();
        let display_name = display_name.map(|s| s.to_string());
        let result = tokio::spawn(async move {
            this.activate_tx(application_id, email, display_name).await
        })
        .await
        .unwrap_or_else(|e| Err(AdmissionError::Task(e.to_string())));

        match result {
            Ok((profile_id, granted_invites)) => {
                record_application_approved();
                info!(
                    application_id = %application_id,
                    profile_id = %profile_id,
                    spots_remaining = pool_state.spots_remaining(),
                    "Application approved"
                );
                Ok(ApproveOutcome::Approved {
                    profile_id,
                    granted_invites,
                    spots_remaining: pool_state.spots_remaining(),
                })
            }
            Err(err) => {
                // Compensating release; without it the failed activation
                // would leak the reserved slot.
                if let Err(release_err) = self.capacity.release_slot().await {
                    error!(
                        application_id = %application_id,
                        error = %release_err,
                        "Failed to release reserved slot after activation failure"
                    );
                }
                match err {
                    AdmissionError::AlreadyDecided => Ok(ApproveOutcome::AlreadyDecided),
                    other => Err(other),
                }
            }
        }
    }

    /// Approval side effects as one transaction.
    async fn activate_tx(
        &self,
        application_id: Uuid,
        email: String,
        display_name: Option<String>,
    ) -> Result<(Uuid, Vec<String>), AdmissionError> {
        // Pre-generate the granted codes so the transaction body never
        // needs a uniqueness retry loop.
        let mut codes = Vec::with_capacity(self.settings.invite_grant_count.max(0) as usize);
        for _ in 0..self.settings.invite_grant_count {
            codes.push(self.invites.generate_unique_code(generate_invite_code).await?);
        }
        let expires_at = Utc::now() + Duration::days(self.settings.invite_expiry_days);

        let mut tx = self.pool.begin().await?;

        let newly_approved = self
            .applications
            .mark_approved(&mut *tx, application_id)
            .await?;
        if !newly_approved {
            tx.rollback().await?;
            return Err(AdmissionError::AlreadyDecided);
        }

        let profile = self
            .profiles
            .activate(
                &mut *tx,
                &email,
                display_name.as_deref(),
                self.settings.invite_grant_count,
            )
            .await?;

        for code in &codes {
            self.invites
                .create(
                    &mut *tx,
                    code,
                    profile.id,
                    self.settings.invite_max_uses,
                    Some(expires_at),
                )
                .await?;
        }

        tx.commit().await?;
        Ok((profile.id, codes))
    }

    /// Reject a pending application (admin override).
    pub async fn reject(&self, application_id: Uuid, reason: &str) -> Result<bool, AdmissionError> {
        let rejected = self.applications.mark_rejected(application_id, reason).await?;
        if rejected {
            info!(application_id = %application_id, "Application rejected");
        }
        Ok(rejected)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn pending(score: Score, app: &ApplicationEntity, at_capacity: bool) -> Evaluation {
        Evaluation {
            score,
            decision: Decision::Pending {
                application_id: app.id,
                referral_code: app.referral_code.clone(),
                at_capacity,
            },
        }
    }
}
