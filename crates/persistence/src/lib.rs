//! Persistence layer for the Betagate backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the atomic capacity ledger

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
