//! Capacity pool entity (database row mapping).

use domain::models::capacity::PoolStatus;
use sqlx::FromRow;

/// Database row mapping for the single-row capacity_pool table.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CapacityPoolEntity {
    pub capacity: i32,
    pub approved_count: i32,
}

impl CapacityPoolEntity {
    pub fn spots_remaining(&self) -> i32 {
        (self.capacity - self.approved_count).max(0)
    }
}

impl From<CapacityPoolEntity> for PoolStatus {
    fn from(entity: CapacityPoolEntity) -> Self {
        Self {
            capacity: entity.capacity,
            approved_count: entity.approved_count,
        }
    }
}
