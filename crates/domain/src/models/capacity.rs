//! Capacity pool domain models.

use serde::Serialize;

/// State of the shared capacity pool.
///
/// Invariant (enforced by the storage layer): `0 <= approved_count <= capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolStatus {
    pub capacity: i32,
    pub approved_count: i32,
}

impl PoolStatus {
    pub fn spots_remaining(&self) -> i32 {
        (self.capacity - self.approved_count).max(0)
    }
}

/// Public capacity status response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CapacityStatusResponse {
    pub capacity: i32,
    pub approved_count: i32,
    pub spots_remaining: i32,
}

impl From<PoolStatus> for CapacityStatusResponse {
    fn from(status: PoolStatus) -> Self {
        Self {
            capacity: status.capacity,
            approved_count: status.approved_count,
            spots_remaining: status.spots_remaining(),
        }
    }
}
