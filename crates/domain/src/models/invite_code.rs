//! Invite code domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An invite code owned by an approved profile.
///
/// A code is redeemable while `is_active`, unexpired, and `uses < max_uses`;
/// all three conditions gate redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteCode {
    pub id: Uuid,
    pub code: String,
    pub owner_id: Uuid,
    pub max_uses: i32,
    pub uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InviteCode {
    /// Whether the code can still be redeemed at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.uses < self.max_uses
            && self.expires_at.map_or(true, |exp| exp > now)
    }
}

lazy_static::lazy_static! {
    static ref INVITE_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Z0-9]{3}-[A-Z0-9]{3}-[A-Z0-9]{3}$").unwrap();
}

/// Request to redeem an invite code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RedeemInviteRequest {
    /// The invite code in XXX-XXX-XXX format (normalized before lookup).
    #[validate(length(min = 1, max = 32, message = "Invalid invite code format"))]
    pub code: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(custom(function = shared::validation::validate_display_name))]
    pub display_name: Option<String>,
}

/// Response after redeeming an invite code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RedeemInviteResponse {
    /// True when the redeemer already had beta access; nothing was consumed.
    pub already_approved: bool,
    pub profile_id: Uuid,
    pub spots_remaining: i32,
}

/// Response after issuing an invite code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct IssueInviteResponse {
    pub code: String,
    pub max_uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub invites_used: i32,
    pub invite_quota: i32,
    pub invite_url: String,
}

/// Summary of an invite code for owner-facing listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteSummary {
    pub code: String,
    pub max_uses: i32,
    pub uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Response for listing an owner's live invite codes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListInvitesResponse {
    pub data: Vec<InviteSummary>,
}

/// Public invite info (for GET /invites/:code without auth).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PublicInviteInfo {
    pub is_valid: bool,
    pub uses_remaining: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Whether a string looks like a well-formed invite code after normalization.
pub fn is_invite_code_format(code: &str) -> bool {
    INVITE_CODE_REGEX.is_match(code)
}

/// Generate a random invite code in XXX-XXX-XXX format.
pub fn generate_invite_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789"; // Avoiding confusing chars: 0, O, I, 1

    let mut segment = || -> String {
        (0..3)
            .map(|_| {
                let idx = rng.gen_range(0..chars.len());
                chars[idx] as char
            })
            .collect()
    };

    format!("{}-{}-{}", segment(), segment(), segment())
}
