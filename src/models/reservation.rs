use crate::error::ConflictReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a single seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    NotReserved,
    Temporary,
    Reserved,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::NotReserved => "NOT_RESERVED",
            ReservationStatus::Temporary => "TEMPORARY",
            ReservationStatus::Reserved => "RESERVED",
        }
    }
}

/// One seat slot of a ticket, pre-created at ticket creation and never
/// deleted. `holder` is non-null iff status is TEMPORARY or RESERVED; all
/// transitions happen under the seat's row lock.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub ticket_id: Uuid,
    pub seat_number: i32,
    pub status: ReservationStatus,
    pub holder: Option<String>,
    pub held_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Create the pristine seat row for a freshly provisioned ticket.
    pub fn unreserved(ticket_id: Uuid, seat_number: i32) -> Self {
        Self {
            reservation_id: Uuid::new_v4(),
            ticket_id,
            seat_number,
            status: ReservationStatus::NotReserved,
            holder: None,
            held_at: None,
        }
    }

    /// Precondition for a new hold: the seat is free and unclaimed.
    pub fn check_free(&self) -> Result<(), ConflictReason> {
        if self.status != ReservationStatus::NotReserved || self.holder.is_some() {
            return Err(ConflictReason::SeatUnavailable);
        }
        Ok(())
    }

    /// Precondition for payment settlement and expiry revert.
    pub fn check_temporary(&self) -> Result<(), ConflictReason> {
        if self.status != ReservationStatus::Temporary {
            return Err(ConflictReason::NotTemporary);
        }
        Ok(())
    }

    /// Precondition for cancellation and request filing.
    pub fn check_reserved(&self) -> Result<(), ConflictReason> {
        if self.status != ReservationStatus::Reserved {
            return Err(ConflictReason::NotReserved);
        }
        Ok(())
    }

    /// Whether the acting identity holds this seat.
    pub fn held_by(&self, username: &str) -> bool {
        self.holder.as_deref() == Some(username)
    }

    /// Whether the hold has been in place strictly longer than `threshold`.
    pub fn held_longer_than(&self, threshold: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.held_at {
            Some(held_at) => now - held_at > threshold,
            None => false,
        }
    }

    /// NOT_RESERVED -> TEMPORARY
    pub fn begin_hold(&mut self, holder: &str, now: DateTime<Utc>) {
        self.status = ReservationStatus::Temporary;
        self.holder = Some(holder.to_string());
        self.held_at = Some(now);
    }

    /// TEMPORARY -> RESERVED. The timestamp is refreshed to the settlement
    /// instant.
    pub fn confirm(&mut self, now: DateTime<Utc>) {
        self.status = ReservationStatus::Reserved;
        self.held_at = Some(now);
    }

    /// TEMPORARY/RESERVED -> NOT_RESERVED (expiry revert or cancellation).
    pub fn release(&mut self) {
        self.status = ReservationStatus::NotReserved;
        self.holder = None;
        self.held_at = None;
    }
}
