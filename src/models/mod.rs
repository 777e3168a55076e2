//! Domain models for the Farebox backend.
//!
//! This module contains all database-backed models representing the core
//! entities of the seat reservation engine. The seat-level transition
//! preconditions live on the models themselves so every store backend
//! enforces one shared copy of the state machine rules.

pub mod history;
pub mod payment;
pub mod request;
pub mod reservation;
pub mod ticket;
pub mod user;

// Re-export all models for convenient access
pub use history::{HistoryEntry, HistoryOperation};
pub use payment::{Payment, PaymentMethod, PaymentOutcome};
pub use request::{CancellationRequest, RequestSubject};
pub use reservation::{Reservation, ReservationStatus};
pub use ticket::{NewTicket, Ticket};
pub use user::{User, UserRole};
