//! Shared utilities and common types for the Betagate backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (admin key hashing and generation)
//! - Input normalization and validation helpers

pub mod crypto;
pub mod validation;
