//! Postgres-backed seat store.
//!
//! Each unit of work is one `pool.begin()` transaction. Row locks are taken
//! with `SELECT ... FOR UPDATE` in the fixed order request -> ticket ->
//! reservation -> wallet; operations addressed by reservation id first read
//! the row without a lock to discover the ticket id, then lock in order and
//! re-validate, so the global order is never violated.

use crate::error::StoreError;
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
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const TICKET_COLUMNS: &str = "ticket_id, origin, destination, departure_at, total_capacity, \
                              remaining_capacity, unit_price, active, created_at";
const RESERVATION_COLUMNS: &str = "reservation_id, ticket_id, seat_number, status, holder, held_at";
const USER_COLUMNS: &str = "username, role, wallet_balance, created_at";
const REQUEST_COLUMNS: &str = "request_id, reservation_id, username, subject, body, submitted_at, \
                               checked, accepted, checked_by";
const HISTORY_COLUMNS: &str = "history_id, reservation_id, username, operation, outcome, \
                               cancelled_by, recorded_at";

pub struct PostgresSeatStore {
    pool: PgPool,
}

impl PostgresSeatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// --- row access helpers, all running on the caller's connection -------------

async fn lock_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {} FROM tickets WHERE ticket_id = $1 FOR UPDATE",
        TICKET_COLUMNS
    ))
    .bind(ticket_id)
    .fetch_optional(conn)
    .await
}

async fn lock_seat(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    seat_number: i32,
) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {} FROM reservations WHERE ticket_id = $1 AND seat_number = $2 FOR UPDATE",
        RESERVATION_COLUMNS
    ))
    .bind(ticket_id)
    .bind(seat_number)
    .fetch_optional(conn)
    .await
}

async fn lock_reservation(
    conn: &mut PgConnection,
    reservation_id: Uuid,
) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {} FROM reservations WHERE reservation_id = $1 FOR UPDATE",
        RESERVATION_COLUMNS
    ))
    .bind(reservation_id)
    .fetch_optional(conn)
    .await
}

async fn lock_wallet(
    conn: &mut PgConnection,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1 FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(conn)
    .await
}

async fn lock_request(
    conn: &mut PgConnection,
    request_id: Uuid,
) -> Result<Option<CancellationRequest>, sqlx::Error> {
    sqlx::query_as::<_, CancellationRequest>(&format!(
        "SELECT {} FROM cancellation_requests WHERE request_id = $1 FOR UPDATE",
        REQUEST_COLUMNS
    ))
    .bind(request_id)
    .fetch_optional(conn)
    .await
}

async fn read_reservation(
    conn: &mut PgConnection,
    reservation_id: Uuid,
) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {} FROM reservations WHERE reservation_id = $1",
        RESERVATION_COLUMNS
    ))
    .bind(reservation_id)
    .fetch_optional(conn)
    .await
}

async fn read_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {} FROM tickets WHERE ticket_id = $1",
        TICKET_COLUMNS
    ))
    .bind(ticket_id)
    .fetch_optional(conn)
    .await
}

async fn read_user(conn: &mut PgConnection, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(conn)
    .await
}

/// Write back a reservation row's mutable fields. A zero-row match means the
/// row vanished under our lock, which cannot happen; treat it as a bug
/// signal and abort.
async fn update_reservation(
    conn: &mut PgConnection,
    reservation: &Reservation,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE reservations SET status = $2, holder = $3, held_at = $4 WHERE reservation_id = $1",
    )
    .bind(reservation.reservation_id)
    .bind(reservation.status)
    .bind(&reservation.holder)
    .bind(reservation.held_at)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(StoreError::Corrupted(format!(
            "reservation {} update affected {} rows",
            reservation.reservation_id,
            result.rows_affected()
        )));
    }
    Ok(())
}

async fn update_remaining_capacity(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    remaining: i32,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE tickets SET remaining_capacity = $2 WHERE ticket_id = $1")
        .bind(ticket_id)
        .bind(remaining)
        .execute(conn)
        .await?;

    if result.rows_affected() != 1 {
        return Err(StoreError::Corrupted(format!(
            "ticket {} capacity update affected {} rows",
            ticket_id,
            result.rows_affected()
        )));
    }
    Ok(())
}

async fn update_wallet_balance(
    conn: &mut PgConnection,
    username: &str,
    balance: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE users SET wallet_balance = $2 WHERE username = $1")
        .bind(username)
        .bind(balance)
        .execute(conn)
        .await?;

    if result.rows_affected() != 1 {
        return Err(StoreError::Corrupted(format!(
            "wallet update for {} affected {} rows",
            username,
            result.rows_affected()
        )));
    }
    Ok(())
}

async fn update_request_decision(
    conn: &mut PgConnection,
    request: &CancellationRequest,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE cancellation_requests SET checked = $2, accepted = $3, checked_by = $4 \
         WHERE request_id = $1",
    )
    .bind(request.request_id)
    .bind(request.checked)
    .bind(request.accepted)
    .bind(&request.checked_by)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(StoreError::Corrupted(format!(
            "request {} update affected {} rows",
            request.request_id,
            result.rows_affected()
        )));
    }
    Ok(())
}

async fn insert_payment(conn: &mut PgConnection, payment: &Payment) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payments (payment_id, reservation_id, username, amount, outcome, method, paid_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(payment.payment_id)
    .bind(payment.reservation_id)
    .bind(&payment.username)
    .bind(payment.amount)
    .bind(payment.outcome)
    .bind(payment.method)
    .bind(payment.paid_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_history(conn: &mut PgConnection, entry: &HistoryEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reservation_history \
         (history_id, reservation_id, username, operation, outcome, cancelled_by, recorded_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.history_id)
    .bind(entry.reservation_id)
    .bind(&entry.username)
    .bind(entry.operation)
    .bind(entry.outcome)
    .bind(&entry.cancelled_by)
    .bind(entry.recorded_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl SeatStore for PostgresSeatStore {
    async fn create_ticket(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        if new.capacity < 1 {
            return Err(StoreError::Corrupted(
                "ticket capacity must be positive".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let ticket = Ticket::from_new(&new, Utc::now());

        sqlx::query(
            "INSERT INTO tickets \
             (ticket_id, origin, destination, departure_at, total_capacity, remaining_capacity, \
              unit_price, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(ticket.ticket_id)
        .bind(&ticket.origin)
        .bind(&ticket.destination)
        .bind(ticket.departure_at)
        .bind(ticket.total_capacity)
        .bind(ticket.remaining_capacity)
        .bind(ticket.unit_price)
        .bind(ticket.active)
        .bind(ticket.created_at)
        .execute(&mut *tx)
        .await?;

        for seat_number in 1..=new.capacity {
            let seat = Reservation::unreserved(ticket.ticket_id, seat_number);
            sqlx::query(
                "INSERT INTO reservations \
                 (reservation_id, ticket_id, seat_number, status, holder, held_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(seat.reservation_id)
            .bind(seat.ticket_id)
            .bind(seat.seat_number)
            .bind(seat.status)
            .bind(&seat.holder)
            .bind(seat.held_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ticket)
    }

    async fn create_user(
        &self,
        username: &str,
        role: UserRole,
        wallet_balance: i64,
    ) -> Result<User, StoreError> {
        let user = User::new(username, role, wallet_balance, Utc::now());

        sqlx::query(
            "INSERT INTO users (username, role, wallet_balance, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&user.username)
        .bind(user.role)
        .bind(user.wallet_balance)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(read_ticket(&mut conn, ticket_id).await?)
    }

    async fn find_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<(Reservation, Ticket)>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let reservation = match read_reservation(&mut conn, reservation_id).await? {
            Some(r) => r,
            None => return Ok(None),
        };
        let ticket = read_ticket(&mut conn, reservation.ticket_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupted(format!(
                    "reservation {} references missing ticket {}",
                    reservation_id, reservation.ticket_id
                ))
            })?;

        Ok(Some((reservation, ticket)))
    }

    async fn wallet_balance(&self, username: &str) -> Result<i64, StoreError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT wallet_balance FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        balance.ok_or_else(|| StoreError::NotFound(format!("user {} not found", username)))
    }

    async fn temporary_holds(&self) -> Result<Vec<Reservation>, StoreError> {
        let holds = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE status = 'TEMPORARY'",
            RESERVATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(holds)
    }

    async fn history_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let entries = sqlx::query_as::<_, HistoryEntry>(&format!(
            "SELECT {} FROM reservation_history WHERE username = $1 \
             ORDER BY recorded_at DESC LIMIT $2",
            HISTORY_COLUMNS
        ))
        .bind(username)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn create_hold(
        &self,
        ticket_id: Uuid,
        seat_number: i32,
        holder: &str,
        now: DateTime<Utc>,
    ) -> Result<HoldCreated, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut ticket = lock_ticket(&mut tx, ticket_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("ticket {} not found", ticket_id)))?;
        ticket.check_holdable(now)?;

        let mut reservation = lock_seat(&mut tx, ticket_id, seat_number)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "seat {} not found for ticket {}",
                    seat_number, ticket_id
                ))
            })?;
        reservation.check_free()?;

        reservation.begin_hold(holder, now);
        ticket.remaining_capacity -= 1;

        update_reservation(&mut tx, &reservation).await?;
        update_remaining_capacity(&mut tx, ticket_id, ticket.remaining_capacity).await?;

        tx.commit().await?;
        Ok(HoldCreated { reservation, ticket })
    }

    async fn settle_payment(
        &self,
        cmd: &SettlementCommand,
        now: DateTime<Utc>,
    ) -> Result<SettlementRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut reservation = lock_reservation(&mut tx, cmd.reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("reservation {} not found", cmd.reservation_id))
            })?;

        if !reservation.held_by(&cmd.username) {
            return Err(StoreError::Forbidden(
                "this temporary reservation does not belong to you".to_string(),
            ));
        }
        reservation.check_temporary()?;

        let wallet = lock_wallet(&mut tx, &cmd.username)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {} not found", cmd.username)))?;

        let outcome = if cmd.method.outcome_is_asserted() {
            cmd.asserted_outcome.ok_or_else(|| {
                StoreError::Corrupted("asserted outcome missing for non-wallet payment".to_string())
            })?
        } else if wallet.wallet_balance >= cmd.amount {
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

        // The attempt is recorded whatever the outcome.
        insert_payment(&mut tx, &payment).await?;
        insert_history(&mut tx, &history).await?;

        let mut wallet_balance = None;
        if outcome.is_successful() {
            if cmd.method.outcome_is_asserted() {
                // External settlement: the wallet is untouched.
            } else {
                let balance = wallet.wallet_balance - cmd.amount;
                update_wallet_balance(&mut tx, &cmd.username, balance).await?;
                wallet_balance = Some(balance);
            }
            reservation.confirm(now);
            update_reservation(&mut tx, &reservation).await?;
        } else if !cmd.method.outcome_is_asserted() {
            wallet_balance = Some(wallet.wallet_balance);
        }

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;

        // Discover the ticket id without a lock, then lock in fixed order
        // and re-validate from the locked rows.
        let probe = read_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("reservation {} not found", reservation_id))
            })?;

        let mut ticket = lock_ticket(&mut tx, probe.ticket_id).await?.ok_or_else(|| {
            StoreError::Corrupted(format!(
                "reservation {} references missing ticket {}",
                reservation_id, probe.ticket_id
            ))
        })?;
        let mut reservation = lock_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupted(format!("reservation {} vanished", reservation_id))
            })?;

        if reservation.check_temporary().is_err() {
            tx.rollback().await?;
            return Ok(RevertOutcome::AlreadySettled(reservation.status));
        }
        if !reservation.held_longer_than(older_than, now) {
            tx.rollback().await?;
            return Ok(RevertOutcome::NotYetExpired);
        }

        reservation.release();
        ticket.remaining_capacity += 1;

        update_reservation(&mut tx, &reservation).await?;
        update_remaining_capacity(&mut tx, ticket.ticket_id, ticket.remaining_capacity).await?;

        tx.commit().await?;
        Ok(RevertOutcome::Released {
            ticket_id: ticket.ticket_id,
            remaining_capacity: ticket.remaining_capacity,
        })
    }

    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        acting: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let probe = read_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("reservation {} not found", reservation_id))
            })?;

        let mut ticket = lock_ticket(&mut tx, probe.ticket_id).await?.ok_or_else(|| {
            StoreError::Corrupted(format!(
                "reservation {} references missing ticket {}",
                reservation_id, probe.ticket_id
            ))
        })?;
        let mut reservation = lock_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupted(format!("reservation {} vanished", reservation_id))
            })?;

        if !reservation.held_by(acting) {
            return Err(StoreError::Forbidden(
                "you can only cancel your own reservations".to_string(),
            ));
        }
        reservation.check_reserved()?;

        let quote = policy::refund_quote(ticket.unit_price, ticket.departure_at, now)?;

        let wallet = lock_wallet(&mut tx, acting)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {} not found", acting)))?;
        let wallet_balance = wallet.wallet_balance + quote.refund_amount;

        reservation.release();
        ticket.remaining_capacity += 1;

        update_wallet_balance(&mut tx, acting, wallet_balance).await?;
        update_reservation(&mut tx, &reservation).await?;
        update_remaining_capacity(&mut tx, ticket.ticket_id, ticket.remaining_capacity).await?;
        insert_history(
            &mut tx,
            &HistoryEntry::cancel(reservation_id, acting, acting, now),
        )
        .await?;

        tx.commit().await?;
        Ok(RefundRecord {
            reservation_id,
            ticket_id: ticket.ticket_id,
            username: acting.to_string(),
            quote,
            wallet_balance,
            remaining_capacity: ticket.remaining_capacity,
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
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("reservation {} not found", reservation_id))
            })?;

        if !reservation.held_by(username) {
            return Err(StoreError::Forbidden(
                "you do not own this reservation".to_string(),
            ));
        }
        reservation.check_reserved()?;

        let ticket = read_ticket(&mut tx, reservation.ticket_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupted(format!(
                    "reservation {} references missing ticket {}",
                    reservation_id, reservation.ticket_id
                ))
            })?;
        if ticket.departed(now) {
            return Err(StoreError::Conflict(
                crate::error::ConflictReason::DeparturePassed,
            ));
        }

        let request = CancellationRequest::new(reservation_id, username, subject, body, now);
        sqlx::query(
            "INSERT INTO cancellation_requests \
             (request_id, reservation_id, username, subject, body, submitted_at, checked, accepted, checked_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(request.request_id)
        .bind(request.reservation_id)
        .bind(&request.username)
        .bind(request.subject)
        .bind(&request.body)
        .bind(request.submitted_at)
        .bind(request.checked)
        .bind(request.accepted)
        .bind(&request.checked_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn approve_request(
        &self,
        request_id: Uuid,
        admin: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestDecision, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut request = lock_request(&mut tx, request_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("request {} not found", request_id)))?;
        request.check_pending()?;

        let admin_user = read_user(&mut tx, admin)
            .await?
            .ok_or_else(|| StoreError::Forbidden(format!("unknown admin {}", admin)))?;
        if !admin_user.is_admin() {
            return Err(StoreError::Forbidden("admin access required".to_string()));
        }

        let probe = read_reservation(&mut tx, request.reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupted(format!(
                    "request {} references missing reservation {}",
                    request_id, request.reservation_id
                ))
            })?;

        let mut ticket = lock_ticket(&mut tx, probe.ticket_id).await?.ok_or_else(|| {
            StoreError::Corrupted(format!(
                "reservation {} references missing ticket {}",
                probe.reservation_id, probe.ticket_id
            ))
        })?;
        let mut reservation = lock_reservation(&mut tx, request.reservation_id)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupted(format!("reservation {} vanished", request.reservation_id))
            })?;

        if ticket.departed(now) {
            // The request can no longer be honored; it is rejected on the
            // spot and the rejection is committed before the conflict
            // surfaces.
            request.decide(false, admin);
            update_request_decision(&mut tx, &request).await?;
            tx.commit().await?;
            return Err(StoreError::Conflict(
                crate::error::ConflictReason::DeparturePassed,
            ));
        }

        match request.subject {
            RequestSubject::Cancel => {
                reservation.check_reserved()?;

                // Penalty measured from the submission instant, not from the
                // moment the admin got around to the queue.
                let quote =
                    policy::refund_quote(ticket.unit_price, ticket.departure_at, request.submitted_at)?;

                let wallet = lock_wallet(&mut tx, &request.username)
                    .await?
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("user {} not found", request.username))
                    })?;
                let wallet_balance = wallet.wallet_balance + quote.refund_amount;

                reservation.release();
                ticket.remaining_capacity += 1;

                update_wallet_balance(&mut tx, &request.username, wallet_balance).await?;
                update_reservation(&mut tx, &reservation).await?;
                update_remaining_capacity(&mut tx, ticket.ticket_id, ticket.remaining_capacity)
                    .await?;
                insert_history(
                    &mut tx,
                    &HistoryEntry::cancel(request.reservation_id, &request.username, admin, now),
                )
                .await?;

                request.decide(true, admin);
                update_request_decision(&mut tx, &request).await?;

                tx.commit().await?;
                Ok(RequestDecision::CancelApproved(Box::new(RefundRecord {
                    reservation_id: request.reservation_id,
                    ticket_id: ticket.ticket_id,
                    username: request.username.clone(),
                    quote,
                    wallet_balance,
                    remaining_capacity: ticket.remaining_capacity,
                    cancelled_by: admin.to_string(),
                })))
            }
            RequestSubject::ChangeDate => {
                request.decide(true, admin);
                update_request_decision(&mut tx, &request).await?;
                tx.commit().await?;
                Ok(RequestDecision::ChangeDateApproved { request_id })
            }
        }
    }

    async fn reject_request(&self, request_id: Uuid, admin: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut request = lock_request(&mut tx, request_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("request {} not found", request_id)))?;
        request.check_pending()?;

        let admin_user = read_user(&mut tx, admin)
            .await?
            .ok_or_else(|| StoreError::Forbidden(format!("unknown admin {}", admin)))?;
        if !admin_user.is_admin() {
            return Err(StoreError::Forbidden("admin access required".to_string()));
        }

        request.decide(false, admin);
        update_request_decision(&mut tx, &request).await?;

        tx.commit().await?;
        Ok(())
    }
}
