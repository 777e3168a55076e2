//! Hold cache: a TTL'd mirror of in-flight temporary holds.
//!
//! The cache is a read optimization and the fast-path gate at payment time,
//! never a source of capacity truth. Its absence means "hold unusable" even
//! if the relational row still shows TEMPORARY; its presence never
//! authorizes payment on its own — settlement re-checks the reservation row
//! under lock. The asymmetry is deliberate: the cache can reject early, but
//! can never approve alone.

mod memory;
mod redis;

pub use memory::InMemoryHoldCache;
pub use redis::RedisHoldCache;

use crate::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Snapshot of a temporary hold, written at hold creation with a TTL equal
/// to the grace period. The unit price recorded here is the price pinned at
/// hold time; settlement charges this amount, never a re-read of the ticket
/// row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldSnapshot {
    pub reservation_id: Uuid,
    pub ticket_id: Uuid,
    pub seat_number: i32,
    pub holder: String,
    pub held_at: DateTime<Utc>,
    pub unit_price: i64,
    pub departure_at: DateTime<Utc>,
    pub grace_minutes: i64,
}

impl HoldSnapshot {
    pub fn key(reservation_id: Uuid) -> String {
        format!("hold:{}", reservation_id)
    }

    pub fn departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_at <= now
    }
}

/// Distributed TTL cache of in-flight holds, keyed by reservation id.
#[async_trait]
pub trait HoldCache: Send + Sync {
    /// Store a snapshot with the given time-to-live.
    async fn put(&self, snapshot: &HoldSnapshot, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch the snapshot for a reservation, if still live.
    async fn get(&self, reservation_id: Uuid) -> Result<Option<HoldSnapshot>, CacheError>;

    /// Drop the snapshot (on successful settlement).
    async fn delete(&self, reservation_id: Uuid) -> Result<(), CacheError>;
}
