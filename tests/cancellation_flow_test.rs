//! Tests of cancellation: quotes, self-service refunds, and the
//! admin-mediated request pipeline.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::Harness;
use farebox_backend::error::{AppError, ConflictReason};
use farebox_backend::models::{
    HistoryOperation, RequestSubject, ReservationStatus,
};
use farebox_backend::store::{RequestDecision, SeatStore};

fn hours(h: i64) -> ChronoDuration {
    ChronoDuration::hours(h)
}

#[tokio::test]
async fn quote_previews_the_early_penalty() {
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let quote = h.service.cancellation_quote(id, "alice").await.unwrap();

    assert_eq!(quote.penalty_percent, 10);
    assert_eq!(quote.penalty_amount, 50_000);
    assert_eq!(quote.refund_amount, 450_000);

    // Read-only: nothing moved
    let (reservation, stored) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Reserved);
    assert_eq!(stored.remaining_capacity, 1);
}

#[tokio::test]
async fn quote_rejects_strangers_and_unpaid_holds() {
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.rider("bob", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let stranger = h.service.cancellation_quote(id, "bob").await;
    assert!(matches!(stranger.unwrap_err(), AppError::Forbidden(_)));

    let hold = h.service.create_hold(ticket.ticket_id, 2, "bob").await.unwrap();
    let unpaid = h
        .service
        .cancellation_quote(hold.reservation.reservation_id, "bob")
        .await;
    assert!(matches!(
        unpaid.unwrap_err(),
        AppError::Conflict(ConflictReason::NotReserved)
    ));
}

#[tokio::test]
async fn self_service_cancellation_refunds_and_frees_the_seat() {
    // Scenario: price 500_000, cancelled 25 hours before departure.
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 100_000).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let record = h.service.cancel_reservation(id, "alice").await.unwrap();

    assert_eq!(record.quote.penalty_amount, 50_000);
    assert_eq!(record.quote.refund_amount, 450_000);
    assert_eq!(record.wallet_balance, 550_000);
    assert_eq!(record.remaining_capacity, 2);
    assert_eq!(h.store.wallet_balance("alice").await.unwrap(), 550_000);

    let (reservation, stored) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::NotReserved);
    assert!(reservation.holder.is_none());
    assert_eq!(stored.remaining_capacity, 2);

    let history = h.store.history().await;
    let cancel = history
        .iter()
        .find(|e| e.operation == HistoryOperation::Cancel)
        .expect("no CANCEL history entry");
    assert_eq!(cancel.cancelled_by.as_deref(), Some("alice"));
}

#[tokio::test]
async fn cancellation_close_to_departure_pays_the_late_penalty() {
    let h = Harness::new();
    let ticket = h.ticket(1, 100_000, ChronoDuration::minutes(30)).await;
    h.rider("alice", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let record = h.service.cancel_reservation(id, "alice").await.unwrap();

    assert_eq!(record.quote.penalty_percent, 50);
    assert_eq!(record.quote.refund_amount, 50_000);
}

#[tokio::test]
async fn cancellation_preconditions_are_enforced() {
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.rider("bob", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let stranger = h.service.cancel_reservation(id, "bob").await;
    assert!(matches!(stranger.unwrap_err(), AppError::Forbidden(_)));

    // A TEMPORARY hold is not cancellable
    let hold = h.service.create_hold(ticket.ticket_id, 2, "bob").await.unwrap();
    let unpaid = h
        .service
        .cancel_reservation(hold.reservation.reservation_id, "bob")
        .await;
    assert!(matches!(
        unpaid.unwrap_err(),
        AppError::Conflict(ConflictReason::NotReserved)
    ));

    // Double cancellation conflicts on the second attempt
    h.service.cancel_reservation(id, "alice").await.unwrap();
    let again = h.service.cancel_reservation(id, "alice").await;
    assert!(matches!(
        again.unwrap_err(),
        AppError::Conflict(ConflictReason::NotReserved)
    ));
}

#[tokio::test]
async fn filing_a_request_requires_a_reserved_owned_seat() {
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.rider("bob", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "family emergency")
        .await
        .unwrap();
    assert!(!request.checked);
    assert_eq!(request.reservation_id, id);

    let stranger = h
        .service
        .file_request(id, "bob", RequestSubject::Cancel, "not mine")
        .await;
    assert!(matches!(stranger.unwrap_err(), AppError::Forbidden(_)));

    let empty = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "   ")
        .await;
    assert!(matches!(empty.unwrap_err(), AppError::Validation(_)));

    let hold = h.service.create_hold(ticket.ticket_id, 2, "bob").await.unwrap();
    let unpaid = h
        .service
        .file_request(
            hold.reservation.reservation_id,
            "bob",
            RequestSubject::Cancel,
            "still unpaid",
        )
        .await;
    assert!(matches!(
        unpaid.unwrap_err(),
        AppError::Conflict(ConflictReason::NotReserved)
    ));
}

#[tokio::test]
async fn approved_cancellation_uses_the_submission_instant_for_the_penalty() {
    let h = Harness::new();
    // 30 minutes to departure at approval time: a "now"-based penalty would
    // be 50%.
    let ticket = h.ticket(2, 500_000, ChronoDuration::minutes(30)).await;
    h.rider("alice", 0).await;
    h.admin("root").await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "plans changed")
        .await
        .unwrap();

    // The request actually sat in the queue since 25 hours before departure.
    h.store
        .backdate_request(request.request_id, Utc::now() - hours(25) + ChronoDuration::minutes(30))
        .await;

    let decision = h
        .service
        .approve_request(request.request_id, "root")
        .await
        .unwrap();

    let record = match decision {
        RequestDecision::CancelApproved(record) => record,
        other => panic!("unexpected decision: {:?}", other),
    };
    assert_eq!(record.quote.penalty_percent, 10);
    assert_eq!(record.quote.refund_amount, 450_000);
    assert_eq!(record.cancelled_by, "root");
    assert_eq!(h.store.wallet_balance("alice").await.unwrap(), 450_000);

    let (reservation, stored) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::NotReserved);
    assert_eq!(stored.remaining_capacity, 2);

    let stored_request = h.store.request(request.request_id).await.unwrap();
    assert!(stored_request.checked);
    assert_eq!(stored_request.accepted, Some(true));
    assert_eq!(stored_request.checked_by.as_deref(), Some("root"));

    let history = h.store.history().await;
    let cancel = history
        .iter()
        .find(|e| e.operation == HistoryOperation::Cancel)
        .expect("no CANCEL history entry");
    assert_eq!(cancel.cancelled_by.as_deref(), Some("root"));
    assert_eq!(cancel.username, "alice");
}

#[tokio::test]
async fn approval_after_departure_auto_rejects_the_request() {
    let h = Harness::new();
    let ticket = h.ticket(1, 100_000, ChronoDuration::milliseconds(300)).await;
    h.rider("alice", 0).await;
    h.admin("root").await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "too late")
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    let result = h.service.approve_request(request.request_id, "root").await;
    assert!(matches!(
        result.unwrap_err(),
        AppError::Conflict(ConflictReason::DeparturePassed)
    ));

    // The rejection was recorded; no refund happened.
    let stored_request = h.store.request(request.request_id).await.unwrap();
    assert!(stored_request.checked);
    assert_eq!(stored_request.accepted, Some(false));
    assert_eq!(h.store.wallet_balance("alice").await.unwrap(), 0);

    let (reservation, _) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Reserved);
}

#[tokio::test]
async fn requests_are_decided_exactly_once() {
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.admin("root").await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "plans changed")
        .await
        .unwrap();

    h.service.approve_request(request.request_id, "root").await.unwrap();

    let again = h.service.approve_request(request.request_id, "root").await;
    assert!(matches!(
        again.unwrap_err(),
        AppError::Conflict(ConflictReason::RequestProcessed)
    ));

    let reject_after = h.service.reject_request(request.request_id, "root").await;
    assert!(matches!(
        reject_after.unwrap_err(),
        AppError::Conflict(ConflictReason::RequestProcessed)
    ));

    // Refunded exactly once
    assert_eq!(h.store.wallet_balance("alice").await.unwrap(), 450_000);
}

#[tokio::test]
async fn rejection_leaves_the_reservation_untouched() {
    let h = Harness::new();
    let ticket = h.ticket(1, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.admin("root").await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "maybe not")
        .await
        .unwrap();

    h.service.reject_request(request.request_id, "root").await.unwrap();

    let stored_request = h.store.request(request.request_id).await.unwrap();
    assert!(stored_request.checked);
    assert_eq!(stored_request.accepted, Some(false));

    let (reservation, _) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Reserved);
    assert_eq!(h.store.wallet_balance("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn only_admins_decide_requests() {
    let h = Harness::new();
    let ticket = h.ticket(1, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.rider("bob", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::Cancel, "plans changed")
        .await
        .unwrap();

    let as_rider = h.service.approve_request(request.request_id, "bob").await;
    assert!(matches!(as_rider.unwrap_err(), AppError::Forbidden(_)));

    let unknown = h.service.reject_request(request.request_id, "ghost").await;
    assert!(matches!(unknown.unwrap_err(), AppError::Forbidden(_)));
}

#[tokio::test]
async fn change_date_approval_touches_only_the_request() {
    let h = Harness::new();
    let ticket = h.ticket(1, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    h.admin("root").await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;

    let request = h
        .service
        .file_request(id, "alice", RequestSubject::ChangeDate, "move to next week")
        .await
        .unwrap();

    let decision = h
        .service
        .approve_request(request.request_id, "root")
        .await
        .unwrap();
    assert!(matches!(decision, RequestDecision::ChangeDateApproved { .. }));

    let (reservation, stored) = h.store.find_reservation(id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Reserved);
    assert_eq!(stored.remaining_capacity, 0);
    assert_eq!(h.store.wallet_balance("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn bookings_return_the_audit_trail_most_recent_first() {
    let h = Harness::new();
    let ticket = h.ticket(2, 500_000, hours(25)).await;
    h.rider("alice", 0).await;
    let id = h.reserved_seat(&ticket, 1, "alice").await;
    h.service.cancel_reservation(id, "alice").await.unwrap();

    let bookings = h.service.bookings("alice", 10).await.unwrap();
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0].operation, HistoryOperation::Cancel);
    assert_eq!(bookings[1].operation, HistoryOperation::Buy);
}
