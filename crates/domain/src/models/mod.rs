//! Domain models for Betagate.

pub mod application;
pub mod capacity;
pub mod invite_code;
pub mod profile;
pub mod queue;
pub mod referral;

pub use application::{Application, ApplicationAnswers, ApplicationStatus};
pub use capacity::PoolStatus;
pub use invite_code::InviteCode;
pub use profile::Profile;
pub use queue::QueuePosition;
