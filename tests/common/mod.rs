//! Shared fixtures for the deterministic test suites. Everything runs
//! against the in-memory store and cache through the real service, so no
//! infrastructure is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use farebox_backend::cache::{HoldCache, HoldSnapshot, InMemoryHoldCache};
use farebox_backend::config::ReservationConfig;
use farebox_backend::models::{
    PaymentMethod, PaymentOutcome, Ticket, User, UserRole,
};
use farebox_backend::scheduler::ExpiryScheduler;
use farebox_backend::services::{ExpiryWorker, ReservationService};
use farebox_backend::store::{MemorySeatStore, SeatStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Scheduler double that records what was armed instead of spawning tasks.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(Uuid, Duration)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<(Uuid, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExpiryScheduler for RecordingScheduler {
    async fn schedule(&self, reservation_id: Uuid, run_after: Duration) {
        self.scheduled.lock().unwrap().push((reservation_id, run_after));
    }
}

pub fn test_config() -> ReservationConfig {
    ReservationConfig {
        grace_minutes: 10,
        expiry_leeway_secs: 10,
        expiry_max_retries: 3,
        expiry_retry_backoff_secs: 1,
    }
}

pub struct Harness {
    pub store: Arc<MemorySeatStore>,
    pub cache: Arc<InMemoryHoldCache>,
    pub scheduler: Arc<RecordingScheduler>,
    pub service: Arc<ReservationService>,
    pub config: ReservationConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ReservationConfig) -> Self {
        let store = Arc::new(MemorySeatStore::new());
        let cache = Arc::new(InMemoryHoldCache::new());
        let scheduler = Arc::new(RecordingScheduler::new());

        let service = Arc::new(ReservationService::new(
            store.clone(),
            cache.clone(),
            scheduler.clone(),
            None,
            config.clone(),
        ));

        Self {
            store,
            cache,
            scheduler,
            service,
            config,
        }
    }

    /// An expiry worker wired to the same store.
    pub fn worker(&self) -> ExpiryWorker {
        ExpiryWorker::new(self.store.clone(), self.config.clone(), None)
    }

    /// Provision a ticket departing `departs_in` from now, with one seat per
    /// unit of capacity.
    pub async fn ticket(&self, capacity: i32, unit_price: i64, departs_in: chrono::Duration) -> Ticket {
        self.store
            .create_ticket(farebox_backend::models::NewTicket {
                origin: "Oslo".to_string(),
                destination: "Bergen".to_string(),
                departure_at: Utc::now() + departs_in,
                capacity,
                unit_price,
            })
            .await
            .expect("failed to create test ticket")
    }

    pub async fn rider(&self, username: &str, wallet_balance: i64) -> User {
        self.store
            .create_user(username, UserRole::User, wallet_balance)
            .await
            .expect("failed to create test user")
    }

    pub async fn admin(&self, username: &str) -> User {
        self.store
            .create_user(username, UserRole::Admin, 0)
            .await
            .expect("failed to create test admin")
    }

    /// Live cache snapshot for a reservation; panics if absent.
    pub async fn cache_entry(&self, reservation_id: Uuid) -> HoldSnapshot {
        self.cache
            .get(reservation_id)
            .await
            .unwrap()
            .expect("cache entry missing")
    }

    /// Rebuild and re-insert a hold snapshot from the store row, simulating
    /// a cache entry that outlived the settlement it belongs to.
    pub async fn reinsert_snapshot(&self, reservation_id: Uuid) {
        let (reservation, ticket) = self
            .store
            .find_reservation(reservation_id)
            .await
            .unwrap()
            .expect("reservation missing");

        let snapshot = HoldSnapshot {
            reservation_id,
            ticket_id: ticket.ticket_id,
            seat_number: reservation.seat_number,
            holder: reservation.holder.clone().unwrap_or_default(),
            held_at: reservation.held_at.unwrap_or_else(Utc::now),
            unit_price: ticket.unit_price,
            departure_at: ticket.departure_at,
            grace_minutes: self.config.grace_minutes,
        };
        self.cache
            .put(&snapshot, Duration::from_secs(600))
            .await
            .unwrap();
    }

    /// Hold a seat and settle it with an externally-asserted success, so the
    /// wallet stays untouched. Returns the reservation id.
    pub async fn reserved_seat(&self, ticket: &Ticket, seat_number: i32, username: &str) -> Uuid {
        let hold = self
            .service
            .create_hold(ticket.ticket_id, seat_number, username)
            .await
            .expect("failed to hold seat");

        let record = self
            .service
            .settle_payment(
                hold.reservation.reservation_id,
                username,
                PaymentMethod::CreditCard,
                Some(PaymentOutcome::Successful),
            )
            .await
            .expect("failed to settle payment");
        assert!(record.is_successful());

        hold.reservation.reservation_id
    }
}
