//! Tests of the expiry worker: revert through the scheduler path, bounded
//! retry on transient store failure, and the startup re-arm sweep.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{Harness, RecordingScheduler};
use farebox_backend::config::ReservationConfig;
use farebox_backend::error::StoreError;
use farebox_backend::models::{
    CancellationRequest, HistoryEntry, NewTicket, Reservation, ReservationStatus, RequestSubject,
    Ticket, User, UserRole,
};
use farebox_backend::services::ExpiryWorker;
use farebox_backend::store::{
    HoldCreated, MemorySeatStore, RefundRecord, RequestDecision, RevertOutcome, SeatStore,
    SettlementCommand, SettlementRecord,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Store wrapper that fails the first N revert attempts with a transient
/// error, delegating everything else.
struct FlakyStore {
    inner: Arc<MemorySeatStore>,
    revert_failures_left: AtomicU32,
    revert_calls: AtomicU32,
}

impl FlakyStore {
    fn new(inner: Arc<MemorySeatStore>, failures: u32) -> Self {
        Self {
            inner,
            revert_failures_left: AtomicU32::new(failures),
            revert_calls: AtomicU32::new(0),
        }
    }

    fn revert_calls(&self) -> u32 {
        self.revert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeatStore for FlakyStore {
    async fn create_ticket(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        self.inner.create_ticket(new).await
    }

    async fn create_user(
        &self,
        username: &str,
        role: UserRole,
        wallet_balance: i64,
    ) -> Result<User, StoreError> {
        self.inner.create_user(username, role, wallet_balance).await
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        self.inner.find_ticket(ticket_id).await
    }

    async fn find_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<(Reservation, Ticket)>, StoreError> {
        self.inner.find_reservation(reservation_id).await
    }

    async fn wallet_balance(&self, username: &str) -> Result<i64, StoreError> {
        self.inner.wallet_balance(username).await
    }

    async fn temporary_holds(&self) -> Result<Vec<Reservation>, StoreError> {
        self.inner.temporary_holds().await
    }

    async fn history_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        self.inner.history_for_user(username, limit).await
    }

    async fn create_hold(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
        holder: &str,
        now: DateTime<Utc>,
    ) -> Result<HoldCreated, StoreError> {
        self.inner.create_hold(ticket_id, seat_number, holder, now).await
    }

    async fn settle_payment(
        &self,
        cmd: &SettlementCommand,
        now: DateTime<Utc>,
    ) -> Result<SettlementRecord, StoreError> {
        self.inner.settle_payment(cmd, now).await
    }

    async fn revert_expired_hold(
        &self,
        reservation_id: Uuid,
        older_than: ChronoDuration,
        now: DateTime<Utc>,
    ) -> Result<RevertOutcome, StoreError> {
        self.revert_calls.fetch_add(1, Ordering::SeqCst);

        let failures = self.revert_failures_left.load(Ordering::SeqCst);
        if failures > 0 {
            self.revert_failures_left.store(failures - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("store is down".to_string()));
        }
        self.inner.revert_expired_hold(reservation_id, older_than, now).await
    }

    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        acting: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRecord, StoreError> {
        self.inner.cancel_reservation(reservation_id, acting, now).await
    }

    async fn file_request(
        &self,
        reservation_id: Uuid,
        username: &str,
        subject: RequestSubject,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<CancellationRequest, StoreError> {
        self.inner
            .file_request(reservation_id, username, subject, body, now)
            .await
    }

    async fn approve_request(
        &self,
        request_id: Uuid,
        admin: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestDecision, StoreError> {
        self.inner.approve_request(request_id, admin, now).await
    }

    async fn reject_request(&self, request_id: Uuid, admin: &str) -> Result<(), StoreError> {
        self.inner.reject_request(request_id, admin).await
    }
}

/// Config with a zero-length grace so freshly created holds are immediately
/// past the revert threshold.
fn instant_expiry_config() -> ReservationConfig {
    ReservationConfig {
        grace_minutes: 0,
        expiry_leeway_secs: 0,
        expiry_max_retries: 3,
        expiry_retry_backoff_secs: 1,
    }
}

#[tokio::test]
async fn worker_reverts_an_expired_hold() {
    let h = Harness::with_config(instant_expiry_config());
    let ticket = h.ticket(2, 100_000, ChronoDuration::hours(4)).await;
    h.rider("alice", 0).await;

    let hold = h.service.create_hold(ticket.ticket_id, 1, "alice").await.unwrap();
    let id = hold.reservation.reservation_id;

    h.worker().run(id).await;

    let (reservation, stored) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::NotReserved);
    assert_eq!(stored.remaining_capacity, 2);
}

#[tokio::test]
async fn worker_noops_on_a_paid_reservation() {
    let h = Harness::with_config(instant_expiry_config());
    let ticket = h.ticket(2, 100_000, ChronoDuration::hours(4)).await;
    h.rider("alice", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    h.worker().run(id).await;

    let (reservation, stored) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Reserved);
    assert_eq!(stored.remaining_capacity, 1);
}

/// Seed a store with one user holding the only seat of a fresh ticket.
async fn seed_expired_hold(inner: &Arc<MemorySeatStore>) -> Uuid {
    inner.create_user("alice", UserRole::User, 0).await.unwrap();
    let ticket = inner
        .create_ticket(NewTicket {
            origin: "Oslo".to_string(),
            destination: "Bergen".to_string(),
            departure_at: Utc::now() + ChronoDuration::hours(4),
            capacity: 1,
            unit_price: 100_000,
        })
        .await
        .unwrap();

    let held = inner
        .create_hold(ticket.ticket_id, 1, "alice", Utc::now())
        .await
        .unwrap();
    held.reservation.reservation_id
}

#[tokio::test(start_paused = true)]
async fn worker_retries_transient_failures_with_backoff() {
    let inner = Arc::new(MemorySeatStore::new());
    let id = seed_expired_hold(&inner).await;

    let flaky = Arc::new(FlakyStore::new(inner.clone(), 2));
    let worker = ExpiryWorker::new(flaky.clone(), instant_expiry_config(), None);
    worker.run(id).await;

    // Two failures, then the successful attempt
    assert_eq!(flaky.revert_calls(), 3);
    let (reservation, ticket) = inner.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::NotReserved);
    assert_eq!(ticket.remaining_capacity, 1);
}

#[tokio::test(start_paused = true)]
async fn worker_gives_up_after_the_retry_budget() {
    let inner = Arc::new(MemorySeatStore::new());
    let id = seed_expired_hold(&inner).await;

    let flaky = Arc::new(FlakyStore::new(inner.clone(), 10));
    let worker = ExpiryWorker::new(flaky.clone(), instant_expiry_config(), None);
    worker.run(id).await;

    // Initial attempt plus the configured retries, then report and stop
    assert_eq!(flaky.revert_calls(), 4);
    let (reservation, ticket) = inner.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Temporary);
    assert_eq!(ticket.remaining_capacity, 0);
}

#[tokio::test]
async fn rearm_sweep_schedules_only_temporary_holds() {
    let h = Harness::new();
    let ticket = h.ticket(3, 100_000, ChronoDuration::hours(4)).await;
    h.rider("alice", 0).await;
    h.rider("bob", 0).await;
    h.rider("carol", 0).await;

    let hold_a = h.service.create_hold(ticket.ticket_id, 1, "alice").await.unwrap();
    let hold_b = h.service.create_hold(ticket.ticket_id, 2, "bob").await.unwrap();
    h.reserved_seat(&ticket, 3, "carol").await;

    // A fresh scheduler, as after a restart
    let scheduler = Arc::new(RecordingScheduler::new());
    let service = farebox_backend::services::ReservationService::new(
        h.store.clone(),
        h.cache.clone(),
        scheduler.clone(),
        None,
        h.config.clone(),
    );

    let count = service.rearm_pending_holds().await.unwrap();
    assert_eq!(count, 2);

    let scheduled: Vec<Uuid> = scheduler.scheduled().iter().map(|(id, _)| *id).collect();
    assert!(scheduled.contains(&hold_a.reservation.reservation_id));
    assert!(scheduled.contains(&hold_b.reservation.reservation_id));
}
