use crate::config::ReservationConfig;
use crate::services::search_index::SearchIndexClient;
use crate::store::{RevertOutcome, SeatStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The compensating action behind every temporary hold: re-validate and
/// revert once the grace period has lapsed.
///
/// Delivery is at-least-once, so the revert is a guarded no-op against any
/// reservation that is no longer TEMPORARY or whose hold is younger than the
/// revert threshold. Transient store failures are retried with bounded
/// backoff; exhausting the retry budget is reported, never swallowed.
pub struct ExpiryWorker {
    store: Arc<dyn SeatStore>,
    config: ReservationConfig,
    search_index: Option<Arc<SearchIndexClient>>,
}

impl ExpiryWorker {
    pub fn new(
        store: Arc<dyn SeatStore>,
        config: ReservationConfig,
        search_index: Option<Arc<SearchIndexClient>>,
    ) -> Self {
        Self {
            store,
            config,
            search_index,
        }
    }

    /// Run one revert check for a reservation.
    pub async fn run(&self, reservation_id: Uuid) {
        let threshold = self.config.expiry_threshold();
        let mut attempt: u32 = 0;

        loop {
            match self
                .store
                .revert_expired_hold(reservation_id, threshold, Utc::now())
                .await
            {
                Ok(RevertOutcome::Released {
                    ticket_id,
                    remaining_capacity,
                }) => {
                    info!(
                        %reservation_id,
                        %ticket_id,
                        remaining_capacity,
                        "expired hold reverted"
                    );
                    if let Some(search) = &self.search_index {
                        search
                            .update_remaining_capacity(ticket_id, remaining_capacity)
                            .await;
                    }
                    return;
                }
                Ok(RevertOutcome::AlreadySettled(status)) => {
                    info!(
                        %reservation_id,
                        status = status.as_str(),
                        "expiry check found reservation already settled"
                    );
                    return;
                }
                Ok(RevertOutcome::NotYetExpired) => {
                    info!(%reservation_id, "expiry check found hold not yet expired");
                    return;
                }
                Err(err) if err.is_transient() && attempt < self.config.expiry_max_retries => {
                    attempt += 1;
                    let backoff = self.config.expiry_backoff(attempt);
                    warn!(
                        %reservation_id,
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        %err,
                        "expiry revert failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    error!(
                        %reservation_id,
                        attempts = attempt + 1,
                        %err,
                        "expiry revert abandoned"
                    );
                    return;
                }
            }
        }
    }
}
