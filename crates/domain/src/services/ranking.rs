//! Queue ranking math.
//!
//! Pending applications are ordered by score descending, submission time
//! ascending (earlier wins ties), then id ascending. The id tiebreak makes
//! the order total: no two distinct pending applications ever compare
//! equal, so a position is always well defined.
//!
//! Referral boosts move an applicant's *effective* position, never the
//! stored score, and can never move anyone past position 1.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Ranking configuration.
#[derive(Debug, Clone, Copy)]
pub struct RankingPolicy {
    /// Positions gained per recorded referral.
    pub boost_per_referral: i64,
    /// Configured throughput used for ETA estimates.
    pub approvals_per_day: u32,
}

/// Sort key of a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey {
    pub score: i32,
    pub submitted_at: DateTime<Utc>,
    pub id: Uuid,
}

impl RankKey {
    /// Total queue ordering: higher score first, then earlier submission,
    /// then smaller id.
    pub fn compare(&self, other: &RankKey) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.submitted_at.cmp(&other.submitted_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Effective position after the referral boost.
///
/// The boost is `referral_count * boost_per_referral`, clamped so the
/// result never drops below 1.
pub fn effective_position(position: i64, referral_count: i64, boost_per_referral: i64) -> i64 {
    if position <= 1 {
        return position.max(1);
    }
    let boost = referral_count
        .saturating_mul(boost_per_referral)
        .clamp(0, position - 1);
    position - boost
}

/// Days until the given effective position is expected to clear the queue.
///
/// Always at least 1 for any position >= 1.
pub fn eta_days(effective_position: i64, approvals_per_day: u32) -> i64 {
    if effective_position < 1 {
        return 0;
    }
    let per_day = i64::from(approvals_per_day.max(1));
    (effective_position + per_day - 1) / per_day
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(score: i32, offset_secs: i64, id: Uuid) -> RankKey {
        let base = DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        RankKey {
            score,
            submitted_at: base + Duration::seconds(offset_secs),
            id,
        }
    }

    #[test]
    fn test_higher_score_ranks_first() {
        let a = key(80, 100, Uuid::new_v4());
        let b = key(60, 0, Uuid::new_v4());
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    #[test]
    fn test_earlier_submission_wins_score_tie() {
        let a = key(70, 0, Uuid::new_v4());
        let b = key(70, 60, Uuid::new_v4());
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn test_ordering_is_total() {
        // Identical (score, submitted_at) pairs are still strictly ordered by id.
        let id_a = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let id_b = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();
        let a = key(70, 0, id_a);
        let b = key(70, 0, id_b);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a), Ordering::Equal);
    }

    #[test]
    fn test_sort_induces_strict_order() {
        let mut keys: Vec<RankKey> = (0..50)
            .map(|i| key(i % 5, i64::from(i % 7), Uuid::new_v4()))
            .collect();
        keys.sort_by(|a, b| a.compare(b));
        for pair in keys.windows(2) {
            assert_eq!(pair[0].compare(&pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn test_effective_position_scenario() {
        // Raw position 20, three referrals at 5 positions each => 5.
        assert_eq!(effective_position(20, 3, 5), 5);
    }

    #[test]
    fn test_effective_position_floor_is_one() {
        assert_eq!(effective_position(4, 3, 5), 1);
        assert_eq!(effective_position(1, 100, 5), 1);
        assert_eq!(effective_position(2, 1, 5), 1);
    }

    #[test]
    fn test_effective_position_no_referrals() {
        assert_eq!(effective_position(7, 0, 5), 7);
    }

    #[test]
    fn test_effective_position_never_below_one() {
        for position in 1..=40 {
            for referrals in 0..=10 {
                let effective = effective_position(position, referrals, 5);
                assert!(effective >= 1);
                assert!(effective <= position);
            }
        }
    }

    #[test]
    fn test_effective_position_overflow_safe() {
        assert_eq!(effective_position(10, i64::MAX, 2), 1);
    }

    #[test]
    fn test_eta_days_rounds_up() {
        assert_eq!(eta_days(1, 25), 1);
        assert_eq!(eta_days(25, 25), 1);
        assert_eq!(eta_days(26, 25), 2);
        assert_eq!(eta_days(100, 25), 4);
    }

    #[test]
    fn test_eta_days_at_least_one() {
        for position in 1..=200 {
            assert!(eta_days(position, 25) >= 1);
        }
    }

    #[test]
    fn test_eta_days_zero_throughput_clamped() {
        assert_eq!(eta_days(10, 0), 10);
    }
}
