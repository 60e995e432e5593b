//! Capacity ledger repository.
//!
//! The single-row capacity_pool table is the shared quota every admission
//! path funnels through. Reservation is a conditional UPDATE, an atomic
//! compare-and-increment at the database, so no interleaving of concurrent
//! callers can push `approved_count` past `capacity`. A naive
//! SELECT-then-INSERT would race; it must never be introduced here.

use sqlx::{PgExecutor, PgPool};

use crate::entities::CapacityPoolEntity;
use crate::metrics::QueryTimer;

/// Repository for the capacity pool.
#[derive(Clone)]
pub struct CapacityRepository {
    pool: PgPool,
}

impl CapacityRepository {
    /// Creates a new CapacityRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Seeds the singleton pool row if it does not exist yet.
    ///
    /// An existing row is left untouched so restarts never reset the
    /// approved count or clobber an admin-adjusted capacity.
    pub async fn ensure_pool(&self, capacity: i32) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("ensure_capacity_pool");
        let result = sqlx::query(
            r#"
            INSERT INTO capacity_pool (id, capacity, approved_count)
            VALUES (TRUE, $1, 0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(capacity)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Current pool state.
    pub async fn status(&self) -> Result<CapacityPoolEntity, sqlx::Error> {
        let timer = QueryTimer::new("capacity_status");
        let result = sqlx::query_as::<_, CapacityPoolEntity>(
            r#"
            SELECT capacity, approved_count
            FROM capacity_pool
            WHERE id
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Atomically claims one slot if any remain.
    ///
    /// Returns the pool state after the claim, or `None` when the pool is
    /// full. The executor parameter lets redemption run the claim inside
    /// its own transaction so the use-increment and the reservation commit
    /// or roll back together.
    pub async fn reserve_slot<'e, E>(
        &self,
        executor: E,
    ) -> Result<Option<CapacityPoolEntity>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let timer = QueryTimer::new("reserve_slot");
        let result = sqlx::query_as::<_, CapacityPoolEntity>(
            r#"
            UPDATE capacity_pool
            SET approved_count = approved_count + 1
            WHERE id AND approved_count < capacity
            RETURNING capacity, approved_count
            "#,
        )
        .fetch_optional(executor)
        .await;
        timer.record();
        result
    }

    /// Gives back one reserved slot.
    ///
    /// The compensating path for a reservation whose follow-up side
    /// effects failed after commit; nothing else may decrement the count.
    pub async fn release_slot(&self) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("release_slot");
        let result = sqlx::query(
            r#"
            UPDATE capacity_pool
            SET approved_count = approved_count - 1
            WHERE id AND approved_count > 0
            "#,
        )
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Adjusts the total capacity.
    ///
    /// Returns `None` when the new capacity is below the current approved
    /// count, which would violate the pool invariant.
    pub async fn set_capacity(
        &self,
        capacity: i32,
    ) -> Result<Option<CapacityPoolEntity>, sqlx::Error> {
        let timer = QueryTimer::new("set_capacity");
        let result = sqlx::query_as::<_, CapacityPoolEntity>(
            r#"
            UPDATE capacity_pool
            SET capacity = $1
            WHERE id AND approved_count <= $1
            RETURNING capacity, approved_count
            "#,
        )
        .bind(capacity)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
