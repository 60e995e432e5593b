//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod application;
pub mod capacity_pool;
pub mod invite_code;
pub mod profile;
pub mod referral_edge;

pub use application::{ApplicationEntity, ApplicationStatusDb};
pub use capacity_pool::CapacityPoolEntity;
pub use invite_code::InviteCodeEntity;
pub use profile::ProfileEntity;
pub use referral_edge::{LeaderboardRowEntity, ReferralEdgeEntity};
