//! Expiry scheduler: delivers one deferred revert check per temporary hold.
//!
//! The scheduler carries no state beyond the reservation id; the worker
//! re-reads everything it needs from the store at fire time and no-ops
//! against already-settled reservations. There is deliberately no cancel
//! operation — the status re-check makes reverts idempotent, which covers
//! duplicate delivery and settled-before-expiry alike.

use crate::services::expiry::ExpiryWorker;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Arms a revert check for a reservation after the given delay.
#[async_trait]
pub trait ExpiryScheduler: Send + Sync {
    async fn schedule(&self, reservation_id: Uuid, run_after: Duration);
}

/// Tokio-task based scheduler: one spawned sleep per armed hold. Tasks die
/// with the process; the startup re-arm sweep restores coverage after a
/// restart.
pub struct TokioScheduler {
    worker: Arc<ExpiryWorker>,
}

impl TokioScheduler {
    pub fn new(worker: Arc<ExpiryWorker>) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl ExpiryScheduler for TokioScheduler {
    async fn schedule(&self, reservation_id: Uuid, run_after: Duration) {
        let worker = self.worker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(run_after).await;
            worker.run(reservation_id).await;
        });
    }
}
