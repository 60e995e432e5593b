//! Admission-engine services orchestrating the repositories.

pub mod admission;
pub mod invite_registry;
pub mod queue;
pub mod referrals;

pub use admission::{AdmissionService, AdmissionSettings, Decision};
pub use invite_registry::{InviteCodeRegistry, InviteError, InviteSettings};
pub use queue::QueueService;
pub use referrals::ReferralService;
