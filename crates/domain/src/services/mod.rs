//! Pure business logic services.

pub mod ranking;
pub mod scoring;

pub use ranking::RankingPolicy;
pub use scoring::{Score, ScoringEngine};
