//! Application entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::application::{Application, ApplicationStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum mapping for the application_status PostgreSQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
pub enum ApplicationStatusDb {
    Pending,
    Approved,
    Rejected,
}

impl From<ApplicationStatusDb> for ApplicationStatus {
    fn from(status: ApplicationStatusDb) -> Self {
        match status {
            ApplicationStatusDb::Pending => ApplicationStatus::Pending,
            ApplicationStatusDb::Approved => ApplicationStatus::Approved,
            ApplicationStatusDb::Rejected => ApplicationStatus::Rejected,
        }
    }
}

impl From<ApplicationStatus> for ApplicationStatusDb {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Pending => ApplicationStatusDb::Pending,
            ApplicationStatus::Approved => ApplicationStatusDb::Approved,
            ApplicationStatus::Rejected => ApplicationStatusDb::Rejected,
        }
    }
}

/// Database row mapping for the applications table.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub answers: serde_json::Value,
    pub score: i32,
    pub status: ApplicationStatusDb,
    pub referral_code: String,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<ApplicationEntity> for Application {
    fn from(entity: ApplicationEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            answers: entity.answers,
            score: entity.score.max(0) as u32,
            status: entity.status.into(),
            referral_code: entity.referral_code,
            rejection_reason: entity.rejection_reason,
            submitted_at: entity.submitted_at,
            approved_at: entity.approved_at,
        }
    }
}
