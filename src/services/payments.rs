use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::Config;
use crate::gateway::{CheckoutRequest, CheckoutSession, PaymentGateway, PaymentStatus};
use crate::models::{Booking, BookingStatus, Role, Transaction, TransactionStatus, User};
use crate::store::MarketStore;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionInput {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInput {
    pub session_id: String,
}

/// Outcome of a settlement attempt that did not fail.
#[derive(Debug)]
pub enum SettlementOutcome {
    /// Inventory decremented, booking marked paid, transaction recorded.
    Settled(Booking),
    /// The booking was already paid; nothing was processed again.
    AlreadySettled(Booking),
}

impl SettlementOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            SettlementOutcome::Settled(b) | SettlementOutcome::AlreadySettled(b) => b,
        }
    }
}

/// Opens a hosted checkout session for an accepted booking. The booking id
/// travels as opaque session metadata and is how the confirmation finds its
/// way back to [`settle`].
pub async fn create_session(
    store: &dyn MarketStore,
    gateway: &dyn PaymentGateway,
    config: &Config,
    buyer: &User,
    input: CreateSessionInput,
) -> Result<CheckoutSession, AppError> {
    let booking = store
        .booking_by_id(input.booking_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Booking '{}' was not found", input.booking_id))
        })?;

    if booking.buyer_id != buyer.id && buyer.role != Role::Admin {
        return Err(AppError::Forbidden(
            "This booking belongs to another buyer".to_string(),
        ));
    }

    if booking.status != BookingStatus::Accepted {
        return Err(AppError::InvalidState(
            "Only accepted bookings can be paid".to_string(),
        ));
    }

    let description = match store.ticket_by_id(booking.ticket_id).await? {
        Some(ticket) => format!(
            "{}x {} -> {}",
            booking.quantity, ticket.origin, ticket.destination
        ),
        None => format!("Booking {}", booking.id),
    };

    let request = CheckoutRequest {
        amount_minor: amount_in_minor_units(booking.total_price)?,
        currency: config.currency.clone(),
        description,
        success_url: config.success_url(),
        cancel_url: config.cancel_url(),
        booking_id: booking.id,
    };

    let session = gateway.create_checkout_session(&request).await?;
    store.set_booking_session(booking.id, &session.id).await?;

    tracing::info!(
        booking_id = %booking.id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok(session)
}

/// Settles a booking after the gateway confirms its payment.
///
/// Idempotent: an already-paid booking is acknowledged without touching
/// inventory again. The inventory decrement is a single conditional update,
/// the one atomic read-modify-write in the system; when it loses (too many
/// bookings were optimistically accepted against a depleted listing) the
/// booking goes to `payment_failed`, a failed transaction is recorded, and
/// the caller gets a 409. Captured funds are NOT refunded here; that branch
/// requires manual reconciliation.
///
/// The transaction row is appended only after the booking transition is
/// applied, so a transaction is never observed without a matching terminal
/// booking state.
pub async fn settle(
    store: &dyn MarketStore,
    gateway: &dyn PaymentGateway,
    session_id: &str,
) -> Result<SettlementOutcome, AppError> {
    let session = gateway.retrieve_session(session_id).await?;

    let booking = store
        .booking_by_id(session.booking_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Booking '{}' was not found", session.booking_id))
        })?;

    // Duplicate confirmation callbacks and client retries land here.
    if booking.status == BookingStatus::Paid {
        tracing::info!(booking_id = %booking.id, "Settlement replay ignored; already paid");
        return Ok(SettlementOutcome::AlreadySettled(booking));
    }

    if session.payment_status != PaymentStatus::Completed {
        return Err(AppError::InvalidState(
            "Payment has not completed for this session".to_string(),
        ));
    }

    if booking.status != BookingStatus::Accepted {
        return Err(AppError::InvalidState(format!(
            "Booking is {:?} and cannot be settled",
            booking.status
        )));
    }

    let decremented = store
        .try_decrement_quantity(booking.ticket_id, booking.quantity)
        .await?;

    if !decremented {
        return fail_settlement(store, &booking).await;
    }

    let transaction_id = Uuid::new_v4();
    let paid_at = Utc::now();

    let marked = store
        .mark_booking_paid(booking.id, transaction_id, paid_at)
        .await?;
    if !marked {
        // A concurrent duplicate beat us between the status check and the
        // conditional transition. Return the units it did not consume.
        store
            .increment_quantity(booking.ticket_id, booking.quantity)
            .await?;
        let current = store
            .booking_by_id(booking.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking '{}' was not found", booking.id)))?;
        if current.status == BookingStatus::Paid {
            return Ok(SettlementOutcome::AlreadySettled(current));
        }
        return Err(AppError::InvalidState(format!(
            "Booking is {:?} and cannot be settled",
            current.status
        )));
    }

    let transaction = Transaction {
        id: transaction_id,
        booking_id: booking.id,
        buyer_id: booking.buyer_id,
        amount: booking.total_price,
        status: TransactionStatus::Completed,
        note: None,
        created_at: paid_at,
    };
    store.insert_transaction(&transaction).await?;

    tracing::info!(
        booking_id = %booking.id,
        transaction_id = %transaction_id,
        amount = %booking.total_price,
        "Booking settled"
    );

    let settled = store
        .booking_by_id(booking.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking '{}' was not found", booking.id)))?;
    Ok(SettlementOutcome::Settled(settled))
}

/// Inventory ran out between the optimistic booking check and settlement.
/// Record the failure durably, then surface the conflict.
async fn fail_settlement(
    store: &dyn MarketStore,
    booking: &Booking,
) -> Result<SettlementOutcome, AppError> {
    let transitioned = store
        .transition_booking(
            booking.id,
            BookingStatus::Accepted,
            BookingStatus::PaymentFailed,
        )
        .await?;

    if !transitioned {
        // Lost a race against another settlement of the same booking.
        let current = store
            .booking_by_id(booking.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking '{}' was not found", booking.id)))?;
        if current.status == BookingStatus::Paid {
            return Ok(SettlementOutcome::AlreadySettled(current));
        }
        return Err(AppError::InventoryConflict(
            "Inventory was insufficient at settlement; manual reconciliation required"
                .to_string(),
        ));
    }

    let transaction = Transaction {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        buyer_id: booking.buyer_id,
        amount: booking.total_price,
        status: TransactionStatus::Failed,
        note: Some("Insufficient inventory at settlement".to_string()),
        created_at: Utc::now(),
    };
    store.insert_transaction(&transaction).await?;

    tracing::warn!(
        booking_id = %booking.id,
        ticket_id = %booking.ticket_id,
        quantity = booking.quantity,
        "Settlement failed: inventory exhausted; payment captured but not fulfilled"
    );

    Err(AppError::InventoryConflict(
        "Inventory was insufficient at settlement; the booking was marked payment_failed and \
         requires manual reconciliation"
            .to_string(),
    ))
}

fn amount_in_minor_units(total: Decimal) -> Result<i64, AppError> {
    (total * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| {
            AppError::ValidationError("Booking total cannot be represented as an amount".to_string())
        })
}
