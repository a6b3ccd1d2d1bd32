mod common;

use std::sync::Arc;

use rust_decimal::Decimal;

use common::{seeded_store, test_config};
use fareport_server::gateway::{MockGateway, PaymentStatus};
use fareport_server::models::{Booking, BookingStatus, TransactionStatus, User};
use fareport_server::services::bookings::{self, CreateBooking};
use fareport_server::services::payments::{self, CreateSessionInput, SettlementOutcome};
use fareport_server::store::{MarketStore, MemStore};
use fareport_server::utils::error::AppError;

/// Books, accepts and opens a checkout session; returns the booking and the
/// session id with the payment already reported completed by the gateway.
async fn paid_session(
    store: &Arc<MemStore>,
    gateway: &Arc<MockGateway>,
    buyer: &User,
    vendor: &User,
    ticket_id: uuid::Uuid,
    quantity: i32,
) -> (Booking, String) {
    let booking = bookings::create_booking(
        store.as_ref(),
        buyer,
        CreateBooking {
            ticket_id,
            quantity,
        },
    )
    .await
    .unwrap();

    bookings::review_booking(store.as_ref(), vendor, booking.id, true)
        .await
        .unwrap();

    let session = payments::create_session(
        store.as_ref(),
        gateway.as_ref(),
        &test_config(),
        buyer,
        CreateSessionInput {
            booking_id: booking.id,
        },
    )
    .await
    .unwrap();

    assert!(gateway.set_payment_status(&session.id, PaymentStatus::Completed));
    (booking, session.id)
}

#[tokio::test]
async fn settlement_decrements_inventory_and_records_transaction() {
    let (store, gateway, buyer, vendor, ticket) = seeded_store(1250, 5).await;
    let (booking, session_id) =
        paid_session(&store, &gateway, &buyer, &vendor, ticket.id, 2).await;

    let outcome = payments::settle(store.as_ref(), gateway.as_ref(), &session_id)
        .await
        .unwrap();
    let settled = match outcome {
        SettlementOutcome::Settled(b) => b,
        other => panic!("expected fresh settlement, got {other:?}"),
    };

    assert_eq!(settled.status, BookingStatus::Paid);
    assert!(settled.paid_at.is_some());
    assert!(settled.transaction_id.is_some());

    let stored_ticket = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored_ticket.available_quantity, 3);

    let txns = store.transactions_for_booking(booking.id).await.unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].status, TransactionStatus::Completed);
    assert_eq!(txns[0].amount, Decimal::new(2500, 2));
    assert_eq!(txns[0].amount, settled.total_price);
    assert_eq!(Some(txns[0].id), settled.transaction_id);
}

#[tokio::test]
async fn settlement_is_idempotent() {
    let (store, gateway, buyer, vendor, ticket) = seeded_store(1000, 5).await;
    let (booking, session_id) =
        paid_session(&store, &gateway, &buyer, &vendor, ticket.id, 1).await;

    let first = payments::settle(store.as_ref(), gateway.as_ref(), &session_id)
        .await
        .unwrap();
    assert!(matches!(first, SettlementOutcome::Settled(_)));

    let second = payments::settle(store.as_ref(), gateway.as_ref(), &session_id)
        .await
        .unwrap();
    assert!(matches!(second, SettlementOutcome::AlreadySettled(_)));

    // Exactly one paid transition, one completed transaction, one decrement.
    let stored_ticket = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored_ticket.available_quantity, 4);
    let txns = store.transactions_for_booking(booking.id).await.unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].status, TransactionStatus::Completed);
}

#[tokio::test]
async fn incomplete_payment_is_rejected() {
    let (store, gateway, buyer, vendor, ticket) = seeded_store(1000, 5).await;
    let (booking, session_id) =
        paid_session(&store, &gateway, &buyer, &vendor, ticket.id, 1).await;

    // Roll the gateway back to pending to simulate an early verify call.
    assert!(gateway.set_payment_status(&session_id, PaymentStatus::Pending));

    let err = payments::settle(store.as_ref(), gateway.as_ref(), &session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Nothing moved.
    let stored = store.booking_by_id(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Accepted);
    let stored_ticket = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored_ticket.available_quantity, 5);
}

#[tokio::test]
async fn unaccepted_booking_cannot_open_a_session() {
    let (store, gateway, buyer, _vendor, ticket) = seeded_store(1000, 5).await;

    let booking = bookings::create_booking(
        store.as_ref(),
        &buyer,
        CreateBooking {
            ticket_id: ticket.id,
            quantity: 1,
        },
    )
    .await
    .unwrap();

    let err = payments::create_session(
        store.as_ref(),
        gateway.as_ref(),
        &test_config(),
        &buyer,
        CreateSessionInput {
            booking_id: booking.id,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn oversold_listing_fails_second_settlement() {
    let (store, gateway, buyer, vendor, ticket) = seeded_store(1000, 1).await;

    // Both bookings pass the soft check against the single remaining unit.
    let (first, first_session) =
        paid_session(&store, &gateway, &buyer, &vendor, ticket.id, 1).await;
    let (second, second_session) =
        paid_session(&store, &gateway, &buyer, &vendor, ticket.id, 1).await;

    let outcome = payments::settle(store.as_ref(), gateway.as_ref(), &first_session)
        .await
        .unwrap();
    assert!(matches!(outcome, SettlementOutcome::Settled(_)));

    let err = payments::settle(store.as_ref(), gateway.as_ref(), &second_session)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InventoryConflict(_)));

    let first_stored = store.booking_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(first_stored.status, BookingStatus::Paid);
    let second_stored = store.booking_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(second_stored.status, BookingStatus::PaymentFailed);

    let stored_ticket = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored_ticket.available_quantity, 0);

    // The failure is durably recorded for reconciliation.
    let failed_txns = store.transactions_for_booking(second.id).await.unwrap();
    assert_eq!(failed_txns.len(), 1);
    assert_eq!(failed_txns[0].status, TransactionStatus::Failed);
    assert!(failed_txns[0].note.is_some());
}

#[tokio::test]
async fn concurrent_settlements_never_oversell() {
    const INVENTORY: i32 = 3;
    const ATTEMPTS: usize = 10;

    let (store, gateway, buyer, vendor, ticket) = seeded_store(1000, INVENTORY).await;

    let mut sessions = Vec::new();
    for _ in 0..ATTEMPTS {
        let (_, session_id) =
            paid_session(&store, &gateway, &buyer, &vendor, ticket.id, 1).await;
        sessions.push(session_id);
    }

    let mut handles = Vec::new();
    for session_id in sessions {
        let store = Arc::clone(&store);
        let gateway = Arc::clone(&gateway);
        handles.push(tokio::spawn(async move {
            payments::settle(store.as_ref(), gateway.as_ref(), &session_id).await
        }));
    }

    let mut settled = 0usize;
    let mut conflicts = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(SettlementOutcome::Settled(_)) => settled += 1,
            Err(AppError::InventoryConflict(_)) => conflicts += 1,
            other => panic!("unexpected settlement result: {other:?}"),
        }
    }

    assert_eq!(settled, INVENTORY as usize);
    assert_eq!(conflicts, ATTEMPTS - INVENTORY as usize);

    let stored_ticket = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored_ticket.available_quantity, 0);

    let txns = store.list_transactions(0, 100).await.unwrap();
    let completed = txns
        .iter()
        .filter(|t| t.status == TransactionStatus::Completed)
        .count();
    let failed = txns
        .iter()
        .filter(|t| t.status == TransactionStatus::Failed)
        .count();
    assert_eq!(completed, INVENTORY as usize);
    assert_eq!(failed, ATTEMPTS - INVENTORY as usize);
}
