//! Profile domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A beta profile, created or activated as a side effect of approval.
///
/// Invariant: `invites_used <= invite_quota`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub beta_access: bool,
    pub invite_quota: i32,
    pub invites_used: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn invites_remaining(&self) -> i32 {
        (self.invite_quota - self.invites_used).max(0)
    }
}
