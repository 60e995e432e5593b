//! Application scoring.
//!
//! The rubric is table-driven: each answer dimension contributes a fixed
//! number of points, the total is the sum, and the configured cap is
//! applied last. Scoring is a pure function of the answers (no I/O, no
//! clock, no randomness), so identical input always yields an identical
//! score.
//!
//! Rubric (default weights):
//!
//! | dimension              | points |
//! |------------------------|--------|
//! | role: producer         | 35     |
//! | role: performer        | 30     |
//! | role: studio engineer  | 25     |
//! | role: hobbyist         | 15     |
//! | avatar uploaded        | 10     |
//! | bio completed          | 10     |
//! | owns hardware          | 25     |
//! | gear list non-empty    | 20     |
//! | referral code supplied | 10     |
//!
//! The raw maximum (110) exceeds the default cap (100) so saturation is
//! observable through `Score::raw`.

use crate::models::application::{ApplicantRole, ApplicationAnswers};

/// Default score cap.
pub const DEFAULT_MAX_SCORE: u32 = 100;

/// Point values for each answer dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub role_producer: u32,
    pub role_performer: u32,
    pub role_studio_engineer: u32,
    pub role_hobbyist: u32,
    pub avatar: u32,
    pub bio: u32,
    pub owns_hardware: u32,
    pub gear_listed: u32,
    pub referral: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            role_producer: 35,
            role_performer: 30,
            role_studio_engineer: 25,
            role_hobbyist: 15,
            avatar: 10,
            bio: 10,
            owns_hardware: 25,
            gear_listed: 20,
            referral: 10,
        }
    }
}

impl ScoreWeights {
    fn for_role(&self, role: ApplicantRole) -> u32 {
        match role {
            ApplicantRole::Producer => self.role_producer,
            ApplicantRole::Performer => self.role_performer,
            ApplicantRole::StudioEngineer => self.role_studio_engineer,
            ApplicantRole::Hobbyist => self.role_hobbyist,
        }
    }
}

/// Result of scoring an application.
///
/// `raw` is the uncapped sum; `capped` is what admission decisions and
/// queue ranking use. `raw > capped` means the rubric saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub raw: u32,
    pub capped: u32,
}

impl Score {
    pub fn saturated(&self) -> bool {
        self.raw > self.capped
    }
}

/// Deterministic, table-driven application scorer.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoreWeights,
    max_score: u32,
}

impl ScoringEngine {
    /// Engine with default weights and the given cap.
    pub fn new(max_score: u32) -> Self {
        Self {
            weights: ScoreWeights::default(),
            max_score,
        }
    }

    pub fn with_weights(weights: ScoreWeights, max_score: u32) -> Self {
        Self { weights, max_score }
    }

    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    /// Scores a set of answers. `referral_supplied` is whether the
    /// submission carried a referral code (the code itself is not part of
    /// the rubric, only its presence).
    pub fn score(&self, answers: &ApplicationAnswers, referral_supplied: bool) -> Score {
        let w = &self.weights;
        let mut raw = w.for_role(answers.role);

        if answers.has_avatar {
            raw += w.avatar;
        }
        if answers.bio_completed {
            raw += w.bio;
        }
        if answers.owns_hardware {
            raw += w.owns_hardware;
        }
        if answers.gear_count > 0 {
            raw += w.gear_listed;
        }
        if referral_supplied {
            raw += w.referral;
        }

        Score {
            raw,
            capped: raw.min(self.max_score),
        }
    }
}
