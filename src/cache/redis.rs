use crate::cache::{HoldCache, HoldSnapshot};
use crate::error::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Redis-backed hold cache. Entries are JSON snapshots written with SETEX;
/// Redis handles the TTL expiry, so an unpaid hold simply vanishes when the
/// grace period lapses.
#[derive(Clone)]
pub struct RedisHoldCache {
    conn: ConnectionManager,
}

impl RedisHoldCache {
    /// Connect to Redis. The connection manager transparently reconnects,
    /// so individual command failures are transient.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::from)?;
        let conn = ConnectionManager::new(client).await.map_err(CacheError::from)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl HoldCache for RedisHoldCache {
    async fn put(&self, snapshot: &HoldSnapshot, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| CacheError::Corrupted(e.to_string()))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(HoldSnapshot::key(snapshot.reservation_id), payload, ttl.as_secs())
            .await?;

        debug!(
            reservation_id = %snapshot.reservation_id,
            ttl_secs = ttl.as_secs(),
            "hold snapshot cached"
        );
        Ok(())
    }

    async fn get(&self, reservation_id: Uuid) -> Result<Option<HoldSnapshot>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(HoldSnapshot::key(reservation_id)).await?;

        raw.map(|payload| {
            serde_json::from_str(&payload).map_err(|e| CacheError::Corrupted(e.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, reservation_id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(HoldSnapshot::key(reservation_id)).await?;
        Ok(())
    }
}
