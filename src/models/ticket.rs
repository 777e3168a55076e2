use crate::error::ConflictReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Capacity ledger entry: one row per sellable departure.
///
/// `remaining_capacity` is only ever mutated inside a row-locked transaction,
/// by exactly the delta of one reservation transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub ticket_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub total_capacity: i32,
    pub remaining_capacity: i32,
    pub unit_price: i64, // minor currency units
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for provisioning a new ticket. Seat reservation rows are pre-created
/// alongside the ledger row, numbered 1..=capacity.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub capacity: i32,
    pub unit_price: i64,
}

impl Ticket {
    pub fn from_new(new: &NewTicket, now: DateTime<Utc>) -> Self {
        Self {
            ticket_id: Uuid::new_v4(),
            origin: new.origin.clone(),
            destination: new.destination.clone(),
            departure_at: new.departure_at,
            total_capacity: new.capacity,
            remaining_capacity: new.capacity,
            unit_price: new.unit_price,
            active: true,
            created_at: now,
        }
    }

    /// Whether the departure instant is no longer in the future.
    pub fn departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_at <= now
    }

    /// Preconditions for placing a new hold against this ticket, checked in
    /// order: departure in the future, ticket active, capacity remaining.
    pub fn check_holdable(&self, now: DateTime<Utc>) -> Result<(), ConflictReason> {
        if self.departed(now) {
            return Err(ConflictReason::DeparturePassed);
        }
        if !self.active {
            return Err(ConflictReason::TicketInactive);
        }
        if self.remaining_capacity < 1 {
            return Err(ConflictReason::SoldOut);
        }
        Ok(())
    }
}
