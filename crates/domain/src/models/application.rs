//! Application domain models for beta program submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state of a beta application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "pending"),
            ApplicationStatus::Approved => write!(f, "approved"),
            ApplicationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Primary role the applicant declared on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantRole {
    Producer,
    Performer,
    StudioEngineer,
    Hobbyist,
}

/// Structured answers from the application form.
///
/// These feed the scoring rubric; everything is optional except the role
/// so partially completed forms still score deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApplicationAnswers {
    pub role: ApplicantRole,

    /// Whether the applicant uploaded an avatar.
    #[serde(default)]
    pub has_avatar: bool,

    /// Whether the applicant filled out their bio.
    #[serde(default)]
    pub bio_completed: bool,

    /// Whether the applicant owns hardware they intend to use in the beta.
    #[serde(default)]
    pub owns_hardware: bool,

    /// Number of gear items the applicant listed.
    #[serde(default)]
    pub gear_count: u32,
}

/// A beta application. Never deleted; rejection keeps the row for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Application {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub answers: serde_json::Value,
    pub score: u32,
    pub status: ApplicationStatus,
    pub referral_code: String,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Request payload for submitting a beta application.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SubmitApplicationRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(custom(function = shared::validation::validate_display_name))]
    pub display_name: String,

    pub answers: ApplicationAnswers,

    /// Invite code; bypasses the score threshold when valid.
    pub invite_code: Option<String>,

    /// Referral code of the applicant who referred this one.
    pub referral_code: Option<String>,

    /// Set by the fronting abuse detection; forces the queue path.
    #[serde(default)]
    pub honeypot_triggered: bool,
}

/// Submission outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Approved,
    Pending,
    AtCapacity,
}

/// Response after submitting an application.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SubmissionResponse {
    pub status: SubmissionStatus,
    pub score: u32,
    pub spots_remaining: i32,
    /// Present on the queue path only; eventually consistent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Share this to earn queue-jump boosts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

/// Request to reject an application (admin override).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RejectApplicationRequest {
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}
