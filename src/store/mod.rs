//! Seat store: the locking transaction executor behind the reservation
//! state machine.
//!
//! Every mutating method is one unit of work: a single transaction that
//! acquires exclusive row locks in the fixed global order
//! request -> ticket -> reservation -> wallet (each operation locking only
//! the subset it needs, in that relative order), re-validates state while
//! holding the locks, applies the writes, and commits. Any failure rolls the
//! whole unit back; no partial writes are ever observable. Cache writes and
//! task scheduling belong to the caller and must happen only after a method
//! returns `Ok` — that is, after commit.

pub mod memory;
pub mod postgres;

pub use memory::MemorySeatStore;
pub use postgres::PostgresSeatStore;

use crate::error::StoreError;
use crate::models::{
    CancellationRequest, HistoryEntry, NewTicket, Payment, PaymentMethod, PaymentOutcome,
    Reservation, ReservationStatus, RequestSubject, Ticket, User, UserRole,
};
use crate::policy::RefundQuote;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of a committed hold creation.
#[derive(Debug, Clone)]
pub struct HoldCreated {
    pub reservation: Reservation,
    /// Ticket row as of the commit, capacity already decremented.
    pub ticket: Ticket,
}

/// Inputs to a settlement unit of work. `amount` is the price pinned from
/// the hold snapshot at hold-creation time, never a re-read of the ticket
/// row.
#[derive(Debug, Clone)]
pub struct SettlementCommand {
    pub reservation_id: Uuid,
    pub username: String,
    pub method: PaymentMethod,
    pub asserted_outcome: Option<PaymentOutcome>,
    pub amount: i64,
}

/// Result of a committed settlement attempt. The payment and history rows
/// are written whatever the outcome; reservation and wallet state only move
/// on success.
#[derive(Debug, Clone)]
pub struct SettlementRecord {
    pub payment: Payment,
    pub history: HistoryEntry,
    /// Balance after the attempt, reported for wallet payments only.
    pub wallet_balance: Option<i64>,
}

impl SettlementRecord {
    pub fn is_successful(&self) -> bool {
        self.payment.outcome.is_successful()
    }
}

/// Result of one expiry revert attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertOutcome {
    /// The hold was stale and has been released back to capacity.
    Released {
        ticket_id: Uuid,
        remaining_capacity: i32,
    },
    /// The reservation is no longer TEMPORARY; nothing to do.
    AlreadySettled(ReservationStatus),
    /// Still TEMPORARY but not yet past the revert threshold (e.g. the seat
    /// was re-held by a newer buyer after the original hold lapsed).
    NotYetExpired,
}

/// Result of a committed cancellation refund.
#[derive(Debug, Clone)]
pub struct RefundRecord {
    pub reservation_id: Uuid,
    pub ticket_id: Uuid,
    pub username: String,
    pub quote: RefundQuote,
    pub wallet_balance: i64,
    pub remaining_capacity: i32,
    pub cancelled_by: String,
}

/// Result of approving a pending request.
#[derive(Debug, Clone)]
pub enum RequestDecision {
    CancelApproved(Box<RefundRecord>),
    ChangeDateApproved { request_id: Uuid },
}

/// The transactional source of truth for capacity, reservations, wallets and
/// the append-only ledgers.
#[async_trait]
pub trait SeatStore: Send + Sync {
    // --- provisioning ------------------------------------------------------

    /// Create a ticket and pre-create one NOT_RESERVED reservation row per
    /// seat, numbered 1..=capacity, in a single transaction.
    async fn create_ticket(&self, new: NewTicket) -> Result<Ticket, StoreError>;

    /// Create a user account with an initial wallet balance.
    async fn create_user(
        &self,
        username: &str,
        role: UserRole,
        wallet_balance: i64,
    ) -> Result<User, StoreError>;

    // --- unlocked reads ----------------------------------------------------

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError>;

    /// Reservation together with its ticket row, without taking locks.
    async fn find_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<(Reservation, Ticket)>, StoreError>;

    async fn wallet_balance(&self, username: &str) -> Result<i64, StoreError>;

    /// All reservations currently in TEMPORARY, for the startup re-arm
    /// sweep.
    async fn temporary_holds(&self) -> Result<Vec<Reservation>, StoreError>;

    /// Audit trail for one user, most recent first.
    async fn history_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, StoreError>;

    // --- locked units of work ---------------------------------------------

    /// NOT_RESERVED -> TEMPORARY under the ticket and seat row locks,
    /// decrementing remaining capacity by one.
    async fn create_hold(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
        holder: &str,
        now: DateTime<Utc>,
    ) -> Result<HoldCreated, StoreError>;

    /// Settle one payment attempt under the reservation and wallet row
    /// locks. Appends payment and history rows for every attempt; moves the
    /// reservation to RESERVED and debits the wallet only on success.
    async fn settle_payment(
        &self,
        cmd: &SettlementCommand,
        now: DateTime<Utc>,
    ) -> Result<SettlementRecord, StoreError>;

    /// Idempotent expiry revert under the ticket and reservation row locks:
    /// release the seat and restore capacity only if the reservation is
    /// still TEMPORARY and the hold is older than `older_than`.
    async fn revert_expired_hold(
        &self,
        reservation_id: Uuid,
        older_than: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<RevertOutcome, StoreError>;

    /// Self-service cancellation under the ticket, reservation and wallet
    /// row locks, with the penalty measured from `now`.
    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        acting: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRecord, StoreError>;

    /// File a change/cancel request against a RESERVED reservation under its
    /// row lock, recording the submission instant.
    async fn file_request(
        &self,
        reservation_id: Uuid,
        username: &str,
        subject: RequestSubject,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<CancellationRequest, StoreError>;

    /// Approve a pending request. CANCEL requests apply the refund with the
    /// penalty measured from the request's submission instant; a departure
    /// that has passed in the meantime auto-rejects the request and surfaces
    /// as a conflict.
    async fn approve_request(
        &self,
        request_id: Uuid,
        admin: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestDecision, StoreError>;

    /// Mark a pending request checked and not accepted.
    async fn reject_request(&self, request_id: Uuid, admin: &str) -> Result<(), StoreError>;
}
