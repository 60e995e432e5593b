//! Queue position computation.
//!
//! Reads run at the store's default isolation; positions are
//! eventually-consistent snapshots and clients poll on a bounded
//! interval. The ranking math itself lives in `domain::services::ranking`.

use domain::models::application::ApplicationStatus;
use domain::models::queue::QueuePosition;
use domain::services::ranking::{self, RankingPolicy};
use persistence::entities::ApplicationEntity;
use persistence::repositories::{ApplicationRepository, ReferralRepository};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Errors that can occur while computing a queue position.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Application not found")]
    NotFound,

    #[error("Application is {0}, not pending")]
    NotPending(ApplicationStatus),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound => ApiError::NotFound("Application not found".into()),
            QueueError::NotPending(status) => {
                ApiError::Conflict(format!("Application is {}", status))
            }
            QueueError::Database(e) => e.into(),
        }
    }
}

/// Computes a pending application's rank among all pending applications.
#[derive(Clone)]
pub struct QueueService {
    applications: ApplicationRepository,
    referrals: ReferralRepository,
    policy: RankingPolicy,
}

impl QueueService {
    pub fn new(pool: PgPool, policy: RankingPolicy) -> Self {
        Self {
            applications: ApplicationRepository::new(pool.clone()),
            referrals: ReferralRepository::new(pool),
            policy,
        }
    }

    /// Position of a pending application in queue order
    /// (score DESC, submitted_at ASC, id ASC).
    pub async fn position(&self, application_id: Uuid) -> Result<QueuePosition, QueueError> {
        let app = self
            .applications
            .find_by_id(application_id)
            .await?
            .ok_or(QueueError::NotFound)?;

        let status: ApplicationStatus = app.status.into();
        if status != ApplicationStatus::Pending {
            return Err(QueueError::NotPending(status));
        }

        self.position_of(&app).await
    }

    /// Position of an application already known to be pending.
    pub async fn position_of(&self, app: &ApplicationEntity) -> Result<QueuePosition, QueueError> {
        let ahead_count = self
            .applications
            .count_ahead(app.score, app.submitted_at, app.id)
            .await?;
        let total_pending = self.applications.count_pending().await?;
        let referral_count = self.referrals.count_for(app.id).await?;

        let position = ahead_count + 1;
        let effective_position =
            ranking::effective_position(position, referral_count, self.policy.boost_per_referral);
        let eta_days = ranking::eta_days(effective_position, self.policy.approvals_per_day);

        Ok(QueuePosition {
            application_id: app.id,
            position,
            total_pending,
            ahead_count,
            behind_count: (total_pending - position).max(0),
            referral_count,
            effective_position,
            eta_days,
        })
    }
}
