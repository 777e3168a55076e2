//! In-memory seat store for tests and infrastructure-free local runs.
//!
//! One async mutex guards the whole state, which is a strict superset of the
//! per-row locks the Postgres backend takes: every unit of work runs alone,
//! so the same precondition checks produce the same outcomes. The
//! transition rules themselves live on the model types and are shared with
//! the Postgres backend.

use crate::error::{ConflictReason, StoreError};
use crate::models::{
    CancellationRequest, HistoryEntry, NewTicket, Payment, PaymentOutcome, Reservation,
    RequestSubject, Ticket, User, UserRole,
};
use crate::policy;
use crate::store::{
    HoldCreated, RefundRecord, RequestDecision, RevertOutcome, SeatStore, SettlementCommand,
    SettlementRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    tickets: HashMap<Uuid, Ticket>,
    reservations: HashMap<Uuid, Reservation>,
    seat_index: HashMap<(Uuid, i32), Uuid>,
    users: HashMap<String, User>,
    payments: Vec<Payment>,
    history: Vec<HistoryEntry>,
    requests: HashMap<Uuid, CancellationRequest>,
}

#[derive(Default)]
pub struct MemorySeatStore {
    state: Mutex<MemoryState>,
}

impl MemorySeatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all payment rows, for assertions.
    pub async fn payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.clone()
    }

    /// Snapshot of all history rows, for assertions.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.clone()
    }

    /// Request row by id, for assertions.
    pub async fn request(&self, request_id: Uuid) -> Option<CancellationRequest> {
        self.state.lock().await.requests.get(&request_id).cloned()
    }

    /// Test support: rewrite a request's submission instant, as if it had
    /// been filed earlier and sat in the admin queue since.
    pub async fn backdate_request(&self, request_id: Uuid, submitted_at: DateTime<Utc>) {
        if let Some(request) = self.state.lock().await.requests.get_mut(&request_id) {
            request.submitted_at = submitted_at;
        }
    }
}

impl MemoryState {
    fn ticket_mut(&mut self, ticket_id: Uuid) -> Result<&mut Ticket, StoreError> {
        self.tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| StoreError::NotFound(format!("ticket {} not found", ticket_id)))
    }

    fn reservation_mut(&mut self, reservation_id: Uuid) -> Result<&mut Reservation, StoreError> {
        self.reservations.get_mut(&reservation_id).ok_or_else(|| {
            StoreError::NotFound(format!("reservation {} not found", reservation_id))
        })
    }

    fn user_mut(&mut self, username: &str) -> Result<&mut User, StoreError> {
        self.users
            .get_mut(username)
            .ok_or_else(|| StoreError::NotFound(format!("user {} not found", username)))
    }

    fn require_admin(&self, username: &str) -> Result<(), StoreError> {
        let user = self
            .users
            .get(username)
            .ok_or_else(|| StoreError::Forbidden(format!("unknown admin {}", username)))?;
        if !user.is_admin() {
            return Err(StoreError::Forbidden("admin access required".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SeatStore for MemorySeatStore {
    async fn create_ticket(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        if new.capacity < 1 {
            return Err(StoreError::Corrupted(
                "ticket capacity must be positive".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let ticket = Ticket::from_new(&new, Utc::now());

        for seat_number in 1..=new.capacity {
            let seat = Reservation::unreserved(ticket.ticket_id, seat_number);
            state
                .seat_index
                .insert((ticket.ticket_id, seat_number), seat.reservation_id);
            state.reservations.insert(seat.reservation_id, seat);
        }
        state.tickets.insert(ticket.ticket_id, ticket.clone());

        Ok(ticket)
    }

    async fn create_user(
        &self,
        username: &str,
        role: UserRole,
        wallet_balance: i64,
    ) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(username) {
            return Err(StoreError::Corrupted(format!(
                "duplicate: user {} already exists",
                username
            )));
        }

        let user = User::new(username, role, wallet_balance, Utc::now());
        state.users.insert(username.to_string(), user.clone());
        Ok(user)
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.state.lock().await.tickets.get(&ticket_id).cloned())
    }

    async fn find_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<(Reservation, Ticket)>, StoreError> {
        let state = self.state.lock().await;
        let reservation = match state.reservations.get(&reservation_id) {
            Some(r) => r.clone(),
            None => return Ok(None),
        };
        let ticket = state
            .tickets
            .get(&reservation.ticket_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Corrupted(format!(
                    "reservation {} references missing ticket {}",
                    reservation_id, reservation.ticket_id
                ))
            })?;
        Ok(Some((reservation, ticket)))
    }

    async fn wallet_balance(&self, username: &str) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        state
            .users
            .get(username)
            .map(|u| u.wallet_balance)
            .ok_or_else(|| StoreError::NotFound(format!("user {} not found", username)))
    }

    async fn temporary_holds(&self) -> Result<Vec<Reservation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .reservations
            .values()
            .filter(|r| r.check_temporary().is_ok())
            .cloned()
            .collect())
    }

    async fn history_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let state = self.state.lock().await;
        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|h| h.username == username)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn create_hold(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
        holder: &str,
        now: DateTime<Utc>,
    ) -> Result<HoldCreated, StoreError> {
        let mut state = self.state.lock().await;

        let ticket = state.ticket_mut(ticket_id)?;
        ticket.check_holdable(now)?;
        let ticket_snapshot = ticket.clone();

        let reservation_id =
            *state
                .seat_index
                .get(&(ticket_id, seat_number))
                .ok_or_else(|| {
                    StoreError::NotFound(format!(
                        "seat {} not found for ticket {}",
                        seat_number, ticket_id
                    ))
                })?;

        let reservation = state.reservation_mut(reservation_id)?;
        reservation.check_free()?;
        reservation.begin_hold(holder, now);
        let reservation_snapshot = reservation.clone();

        let ticket = state.ticket_mut(ticket_id)?;
        ticket.remaining_capacity -= 1;

        Ok(HoldCreated {
            reservation: reservation_snapshot,
            ticket: Ticket {
                remaining_capacity: ticket.remaining_capacity,
                ..ticket_snapshot
            },
        })
    }

    async fn settle_payment(
        &self,
        cmd: &SettlementCommand,
        now: DateTime<Utc>,
    ) -> Result<SettlementRecord, StoreError> {
        let mut state = self.state.lock().await;

        let reservation = state.reservation_mut(cmd.reservation_id)?;
        if !reservation.held_by(&cmd.username) {
            return Err(StoreError::Forbidden(
                "this temporary reservation does not belong to you".to_string(),
            ));
        }
        reservation.check_temporary()?;

        let balance = state.user_mut(&cmd.username)?.wallet_balance;

        let outcome = if cmd.method.outcome_is_asserted() {
            cmd.asserted_outcome.ok_or_else(|| {
                StoreError::Corrupted("asserted outcome missing for non-wallet payment".to_string())
            })?
        } else if balance >= cmd.amount {
            PaymentOutcome::Successful
        } else {
            PaymentOutcome::Unsuccessful
        };

        let payment = Payment::new(
            cmd.reservation_id,
            &cmd.username,
            cmd.amount,
            outcome,
            cmd.method,
            now,
        );
        let history = HistoryEntry::buy(cmd.reservation_id, &cmd.username, outcome, now);
        state.payments.push(payment.clone());
        state.history.push(history.clone());

        let mut wallet_balance = None;
        if outcome.is_successful() {
            if !cmd.method.outcome_is_asserted() {
                let user = state.user_mut(&cmd.username)?;
                user.wallet_balance -= cmd.amount;
                wallet_balance = Some(user.wallet_balance);
            }
            state.reservation_mut(cmd.reservation_id)?.confirm(now);
        } else if !cmd.method.outcome_is_asserted() {
            wallet_balance = Some(balance);
        }

        Ok(SettlementRecord {
            payment,
            history,
            wallet_balance,
        })
    }

    async fn revert_expired_hold(
        &self,
        reservation_id: Uuid,
        older_than: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<RevertOutcome, StoreError> {
        let mut state = self.state.lock().await;

        let reservation = state.reservation_mut(reservation_id)?;
        if reservation.check_temporary().is_err() {
            return Ok(RevertOutcome::AlreadySettled(reservation.status));
        }
        if !reservation.held_longer_than(older_than, now) {
            return Ok(RevertOutcome::NotYetExpired);
        }

        let ticket_id = reservation.ticket_id;
        reservation.release();

        let ticket = state.ticket_mut(ticket_id)?;
        ticket.remaining_capacity += 1;

        Ok(RevertOutcome::Released {
            ticket_id,
            remaining_capacity: ticket.remaining_capacity,
        })
    }

    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        acting: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRecord, StoreError> {
        let mut state = self.state.lock().await;

        let reservation = state.reservation_mut(reservation_id)?;
        if !reservation.held_by(acting) {
            return Err(StoreError::Forbidden(
                "you can only cancel your own reservations".to_string(),
            ));
        }
        reservation.check_reserved()?;
        let ticket_id = reservation.ticket_id;

        let ticket = state.ticket_mut(ticket_id)?;
        let quote = policy::refund_quote(ticket.unit_price, ticket.departure_at, now)?;
        ticket.remaining_capacity += 1;
        let remaining_capacity = ticket.remaining_capacity;

        state.reservation_mut(reservation_id)?.release();

        let user = state.user_mut(acting)?;
        user.wallet_balance += quote.refund_amount;
        let wallet_balance = user.wallet_balance;

        state
            .history
            .push(HistoryEntry::cancel(reservation_id, acting, acting, now));

        Ok(RefundRecord {
            reservation_id,
            ticket_id,
            username: acting.to_string(),
            quote,
            wallet_balance,
            remaining_capacity,
            cancelled_by: acting.to_string(),
        })
    }

    async fn file_request(
        &self,
        reservation_id: Uuid,
        username: &str,
        subject: RequestSubject,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<CancellationRequest, StoreError> {
        let mut state = self.state.lock().await;

        let reservation = state.reservation_mut(reservation_id)?;
        if !reservation.held_by(username) {
            return Err(StoreError::Forbidden(
                "you do not own this reservation".to_string(),
            ));
        }
        reservation.check_reserved()?;
        let ticket_id = reservation.ticket_id;

        let ticket = state.ticket_mut(ticket_id)?;
        if ticket.departed(now) {
            return Err(StoreError::Conflict(ConflictReason::DeparturePassed));
        }

        let request = CancellationRequest::new(reservation_id, username, subject, body, now);
        state.requests.insert(request.request_id, request.clone());
        Ok(request)
    }

    async fn approve_request(
        &self,
        request_id: Uuid,
        admin: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestDecision, StoreError> {
        let mut state = self.state.lock().await;

        state.require_admin(admin)?;

        let request = state
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("request {} not found", request_id)))?;
        request.check_pending()?;

        let reservation = state.reservation_mut(request.reservation_id)?.clone();
        let ticket = state.ticket_mut(reservation.ticket_id)?.clone();

        if ticket.departed(now) {
            // Auto-reject: the decision is recorded, then the conflict
            // surfaces to the approving admin.
            let stored = state.requests.get_mut(&request_id).expect("request vanished");
            stored.decide(false, admin);
            return Err(StoreError::Conflict(ConflictReason::DeparturePassed));
        }

        match request.subject {
            RequestSubject::Cancel => {
                reservation.check_reserved()?;

                let quote =
                    policy::refund_quote(ticket.unit_price, ticket.departure_at, request.submitted_at)?;

                state.reservation_mut(request.reservation_id)?.release();

                let ticket = state.ticket_mut(reservation.ticket_id)?;
                ticket.remaining_capacity += 1;
                let remaining_capacity = ticket.remaining_capacity;

                let user = state.user_mut(&request.username)?;
                user.wallet_balance += quote.refund_amount;
                let wallet_balance = user.wallet_balance;

                state.history.push(HistoryEntry::cancel(
                    request.reservation_id,
                    &request.username,
                    admin,
                    now,
                ));

                let stored = state.requests.get_mut(&request_id).expect("request vanished");
                stored.decide(true, admin);

                Ok(RequestDecision::CancelApproved(Box::new(RefundRecord {
                    reservation_id: request.reservation_id,
                    ticket_id: reservation.ticket_id,
                    username: request.username.clone(),
                    quote,
                    wallet_balance,
                    remaining_capacity,
                    cancelled_by: admin.to_string(),
                })))
            }
            RequestSubject::ChangeDate => {
                let stored = state.requests.get_mut(&request_id).expect("request vanished");
                stored.decide(true, admin);
                Ok(RequestDecision::ChangeDateApproved { request_id })
            }
        }
    }

    async fn reject_request(&self, request_id: Uuid, admin: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        state.require_admin(admin)?;

        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| StoreError::NotFound(format!("request {} not found", request_id)))?;
        request.check_pending()?;
        request.decide(false, admin);

        Ok(())
    }
}
