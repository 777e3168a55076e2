use crate::cache::{HoldCache, HoldSnapshot};
use crate::config::ReservationConfig;
use crate::error::{AppError, AppResult, ConflictReason};
use crate::models::{
    CancellationRequest, HistoryEntry, PaymentMethod, PaymentOutcome, Reservation, RequestSubject,
};
use crate::policy::{self, RefundQuote};
use crate::scheduler::ExpiryScheduler;
use crate::services::search_index::SearchIndexClient;
use crate::store::{
    RefundRecord, RequestDecision, SeatStore, SettlementCommand, SettlementRecord,
};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Side effects deferred until after a store unit of work has committed.
///
/// A rollback must never leave a cache entry or an armed task referring to
/// state that never happened, so nothing here runs unless the store call
/// returned `Ok`. Hook failures are logged and swallowed: the relational
/// commit already succeeded, and the caller must not see it undone.
struct PostCommit {
    hooks: Vec<(&'static str, BoxFuture<'static, Result<(), String>>)>,
}

impl PostCommit {
    fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    fn push<F>(&mut self, label: &'static str, hook: F)
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.hooks.push((label, hook.boxed()));
    }

    async fn run(self) {
        for (label, hook) in self.hooks {
            if let Err(err) = hook.await {
                error!(hook = label, %err, "post-commit hook failed");
            }
        }
    }
}

/// A freshly created hold, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct HoldDetails {
    pub reservation: Reservation,
    pub unit_price: i64,
    pub expires_in_minutes: i64,
}

/// The reservation state machine.
///
/// Drives every seat through its lifecycle — hold, settlement, expiry
/// revert, cancellation — with all serialization delegated to the store's
/// row locks. The hold cache and expiry scheduler are injected
/// collaborators; neither is ever treated as a source of capacity truth.
pub struct ReservationService {
    store: Arc<dyn SeatStore>,
    hold_cache: Arc<dyn HoldCache>,
    scheduler: Arc<dyn ExpiryScheduler>,
    search_index: Option<Arc<SearchIndexClient>>,
    config: ReservationConfig,
}

impl ReservationService {
    pub fn new(
        store: Arc<dyn SeatStore>,
        hold_cache: Arc<dyn HoldCache>,
        scheduler: Arc<dyn ExpiryScheduler>,
        search_index: Option<Arc<SearchIndexClient>>,
        config: ReservationConfig,
    ) -> Self {
        Self {
            store,
            hold_cache,
            scheduler,
            search_index,
            config,
        }
    }

    fn push_search_update(&self, hooks: &mut PostCommit, ticket_id: Uuid, remaining: i32) {
        if let Some(search) = self.search_index.clone() {
            hooks.push("search index update", async move {
                search.update_remaining_capacity(ticket_id, remaining).await;
                Ok(())
            });
        }
    }

    /// Place a temporary hold on a seat.
    ///
    /// On commit the hold is mirrored into the cache with a TTL equal to the
    /// grace period and an expiry check is armed for the same instant.
    pub async fn create_hold(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
        holder: &str,
    ) -> AppResult<HoldDetails> {
        if seat_number < 1 {
            return Err(AppError::Validation(
                "seat_number must be a positive integer".to_string(),
            ));
        }
        if holder.is_empty() {
            return Err(AppError::Validation("holder must not be empty".to_string()));
        }

        let now = Utc::now();
        let created = self
            .store
            .create_hold(ticket_id, seat_number, holder, now)
            .await?;

        info!(
            %ticket_id,
            seat_number,
            holder,
            reservation_id = %created.reservation.reservation_id,
            remaining_capacity = created.ticket.remaining_capacity,
            "seat held temporarily"
        );

        let snapshot = HoldSnapshot {
            reservation_id: created.reservation.reservation_id,
            ticket_id,
            seat_number,
            holder: holder.to_string(),
            held_at: now,
            unit_price: created.ticket.unit_price,
            departure_at: created.ticket.departure_at,
            grace_minutes: self.config.grace_minutes,
        };
        let ttl = self.config.grace_std();

        let mut hooks = PostCommit::new();
        let cache = self.hold_cache.clone();
        let cached = snapshot.clone();
        hooks.push("hold cache write", async move {
            cache.put(&cached, ttl).await.map_err(|e| e.to_string())
        });
        let scheduler = self.scheduler.clone();
        let reservation_id = created.reservation.reservation_id;
        hooks.push("expiry scheduling", async move {
            scheduler.schedule(reservation_id, ttl).await;
            Ok(())
        });
        self.push_search_update(&mut hooks, ticket_id, created.ticket.remaining_capacity);
        hooks.run().await;

        Ok(HoldDetails {
            reservation: created.reservation,
            unit_price: snapshot.unit_price,
            expires_in_minutes: self.config.grace_minutes,
        })
    }

    /// Settle one payment attempt against a temporary hold.
    ///
    /// The cache read is the lock-free first gate: a missing snapshot means
    /// the hold is unusable, whatever the relational row says. The price
    /// charged is the one pinned in the snapshot at hold time. Both audit
    /// rows are written whatever the outcome; an unsuccessful attempt leaves
    /// the hold TEMPORARY and retryable until the grace period lapses.
    pub async fn settle_payment(
        &self,
        reservation_id: Uuid,
        username: &str,
        method: PaymentMethod,
        asserted_outcome: Option<PaymentOutcome>,
    ) -> AppResult<SettlementRecord> {
        match (method.outcome_is_asserted(), asserted_outcome.is_some()) {
            (false, true) => {
                return Err(AppError::Validation(
                    "payment status cannot be provided for WALLET payments; it is determined \
                     automatically"
                        .to_string(),
                ));
            }
            (true, false) => {
                return Err(AppError::Validation(format!(
                    "payment status is required for {} payments",
                    method.as_str()
                )));
            }
            _ => {}
        }

        let snapshot = self
            .hold_cache
            .get(reservation_id)
            .await?
            .ok_or(ConflictReason::HoldExpired)?;

        if snapshot.holder != username {
            return Err(AppError::Forbidden(
                "this temporary reservation does not belong to you".to_string(),
            ));
        }

        let now = Utc::now();
        if snapshot.departed(now) {
            return Err(ConflictReason::DeparturePassed.into());
        }

        let cmd = SettlementCommand {
            reservation_id,
            username: username.to_string(),
            method,
            asserted_outcome,
            amount: snapshot.unit_price,
        };
        let record = self.store.settle_payment(&cmd, now).await?;

        info!(
            %reservation_id,
            username,
            method = method.as_str(),
            outcome = record.payment.outcome.as_str(),
            amount = record.payment.amount,
            "payment attempt settled"
        );

        if record.is_successful() {
            let mut hooks = PostCommit::new();
            let cache = self.hold_cache.clone();
            hooks.push("hold cache delete", async move {
                cache.delete(reservation_id).await.map_err(|e| e.to_string())
            });
            hooks.run().await;
        }

        Ok(record)
    }

    /// Preview the penalty a self-service cancellation executed now would
    /// carry. Read-only; takes no locks.
    pub async fn cancellation_quote(
        &self,
        reservation_id: Uuid,
        username: &str,
    ) -> AppResult<RefundQuote> {
        let (reservation, ticket) = self
            .store
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("reservation {} not found", reservation_id))
            })?;

        if !reservation.held_by(username) {
            return Err(AppError::Forbidden(
                "you can only check your own reservations".to_string(),
            ));
        }
        reservation.check_reserved()?;

        let quote = policy::refund_quote(ticket.unit_price, ticket.departure_at, Utc::now())?;
        Ok(quote)
    }

    /// Cancel a RESERVED reservation held by `acting`, refunding the price
    /// less the proximity penalty measured from now.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        acting: &str,
    ) -> AppResult<RefundRecord> {
        let record = self
            .store
            .cancel_reservation(reservation_id, acting, Utc::now())
            .await?;

        info!(
            %reservation_id,
            acting,
            refund = record.quote.refund_amount,
            penalty = record.quote.penalty_amount,
            "reservation cancelled"
        );

        let mut hooks = PostCommit::new();
        self.push_search_update(&mut hooks, record.ticket_id, record.remaining_capacity);
        hooks.run().await;

        Ok(record)
    }

    /// File a change/cancel request against a RESERVED reservation. The
    /// submission instant recorded here pins the penalty for a later
    /// approval.
    pub async fn file_request(
        &self,
        reservation_id: Uuid,
        username: &str,
        subject: RequestSubject,
        body: &str,
    ) -> AppResult<CancellationRequest> {
        if body.trim().is_empty() {
            return Err(AppError::Validation(
                "request body must not be empty".to_string(),
            ));
        }

        let request = self
            .store
            .file_request(reservation_id, username, subject, body, Utc::now())
            .await?;

        info!(
            %reservation_id,
            username,
            request_id = %request.request_id,
            subject = ?subject,
            "request filed"
        );
        Ok(request)
    }

    /// Approve a pending request as `admin`.
    pub async fn approve_request(
        &self,
        request_id: Uuid,
        admin: &str,
    ) -> AppResult<RequestDecision> {
        let decision = self.store.approve_request(request_id, admin, Utc::now()).await?;

        if let RequestDecision::CancelApproved(record) = &decision {
            info!(
                %request_id,
                admin,
                username = record.username.as_str(),
                refund = record.quote.refund_amount,
                "cancellation request approved"
            );

            let mut hooks = PostCommit::new();
            self.push_search_update(&mut hooks, record.ticket_id, record.remaining_capacity);
            hooks.run().await;
        } else {
            info!(%request_id, admin, "request approved");
        }

        Ok(decision)
    }

    /// Reject a pending request as `admin`.
    pub async fn reject_request(&self, request_id: Uuid, admin: &str) -> AppResult<()> {
        self.store.reject_request(request_id, admin).await?;
        info!(%request_id, admin, "request rejected");
        Ok(())
    }

    /// The acting user's audit trail, most recent first.
    pub async fn bookings(&self, username: &str, limit: i64) -> AppResult<Vec<HistoryEntry>> {
        Ok(self.store.history_for_user(username, limit).await?)
    }

    /// Re-arm expiry checks for every hold still TEMPORARY in the store.
    ///
    /// Armed tasks do not survive a restart; this sweep runs at startup so
    /// holds created before the restart still get their revert check.
    /// Already-lapsed holds are checked immediately.
    pub async fn rearm_pending_holds(&self) -> AppResult<usize> {
        let holds = self.store.temporary_holds().await?;
        let now = Utc::now();
        let count = holds.len();

        for hold in holds {
            let age = match hold.held_at {
                Some(held_at) => now - held_at,
                None => chrono::Duration::zero(),
            };
            let run_after = (self.config.grace() - age)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            self.scheduler.schedule(hold.reservation_id, run_after).await;
        }

        if count > 0 {
            info!(count, "re-armed expiry checks for pending holds");
        }
        Ok(count)
    }
}
