//! Profile entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::profile::Profile;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the profiles table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub beta_access: bool,
    pub invite_quota: i32,
    pub invites_used: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileEntity> for Profile {
    fn from(entity: ProfileEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            beta_access: entity.beta_access,
            invite_quota: entity.invite_quota,
            invites_used: entity.invites_used,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
