//! Domain layer for the Betagate backend.
//!
//! This crate contains:
//! - Domain models (Application, Profile, InviteCode, capacity pool state)
//! - Pure business logic services (application scoring, queue ranking)

pub mod models;
pub mod services;
