use crate::cache::{HoldCache, HoldSnapshot};
use crate::error::CacheError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Process-local hold cache for tests and single-node deployments without a
/// Redis cluster. Expiry is lazy: entries past their deadline are dropped on
/// read. Deadlines use the tokio clock, so paused-clock tests can drive TTL
/// expiry deterministically.
#[derive(Default)]
pub struct InMemoryHoldCache {
    entries: Mutex<HashMap<Uuid, (HoldSnapshot, Instant)>>,
}

impl InMemoryHoldCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HoldCache for InMemoryHoldCache {
    async fn put(&self, snapshot: &HoldSnapshot, ttl: Duration) -> Result<(), CacheError> {
        let deadline = Instant::now() + ttl;
        self.entries
            .lock()
            .expect("hold cache lock poisoned")
            .insert(snapshot.reservation_id, (snapshot.clone(), deadline));
        Ok(())
    }

    async fn get(&self, reservation_id: Uuid) -> Result<Option<HoldSnapshot>, CacheError> {
        let mut entries = self.entries.lock().expect("hold cache lock poisoned");
        match entries.get(&reservation_id) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                entries.remove(&reservation_id);
                Ok(None)
            }
            Some((snapshot, _)) => Ok(Some(snapshot.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, reservation_id: Uuid) -> Result<(), CacheError> {
        self.entries
            .lock()
            .expect("hold cache lock poisoned")
            .remove(&reservation_id);
        Ok(())
    }
}
