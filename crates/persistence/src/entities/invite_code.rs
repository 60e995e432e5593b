//! Invite code entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::invite_code::InviteCode;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the invite_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct InviteCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub owner_id: Uuid,
    pub max_uses: i32,
    pub uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InviteCodeEntity {
    /// Whether the code can still be redeemed at `now`. Mirrors the
    /// conditions the redemption UPDATE enforces atomically.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.uses < self.max_uses
            && self.expires_at.map_or(true, |exp| exp > now)
    }
}

impl From<InviteCodeEntity> for InviteCode {
    fn from(entity: InviteCodeEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            owner_id: entity.owner_id,
            max_uses: entity.max_uses,
            uses: entity.uses,
            is_active: entity.is_active,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
        }
    }
}
