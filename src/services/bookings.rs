use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Role, User};
use crate::store::MarketStore;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub ticket_id: Uuid,
    pub quantity: i32,
}

/// Creates a pending booking against a listing.
///
/// The availability check here is a soft validation only: nothing is
/// reserved, and concurrent bookings may all pass it. Inventory is actually
/// taken at settlement, where the conditional decrement is the arbiter.
/// The listing price is snapshotted into the booking so later edits never
/// change what the buyer owes.
pub async fn create_booking(
    store: &dyn MarketStore,
    buyer: &User,
    input: CreateBooking,
) -> Result<Booking, AppError> {
    if input.quantity < 1 {
        return Err(AppError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let ticket = store
        .ticket_by_id(input.ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{}' was not found", input.ticket_id)))?;

    if !ticket.is_bookable() {
        return Err(AppError::InvalidState(
            "This listing is not open for booking".to_string(),
        ));
    }

    if ticket.available_quantity < input.quantity {
        return Err(AppError::InsufficientInventory(format!(
            "Only {} of {} requested tickets are available",
            ticket.available_quantity, input.quantity
        )));
    }

    let now = Utc::now();
    let booking = Booking {
        id: Uuid::new_v4(),
        ticket_id: ticket.id,
        buyer_id: buyer.id,
        buyer_name: buyer.name.clone(),
        buyer_email: buyer.email.clone(),
        quantity: input.quantity,
        unit_price: ticket.price,
        total_price: ticket.price * Decimal::from(input.quantity),
        status: BookingStatus::Pending,
        session_id: None,
        transaction_id: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };

    store.insert_booking(&booking).await?;
    tracing::info!(
        booking_id = %booking.id,
        ticket_id = %ticket.id,
        quantity = booking.quantity,
        "Booking created"
    );

    Ok(booking)
}

pub async fn my_bookings(store: &dyn MarketStore, buyer: &User) -> Result<Vec<Booking>, AppError> {
    Ok(store.bookings_for_buyer(buyer.id).await?)
}

pub async fn vendor_bookings(
    store: &dyn MarketStore,
    vendor: &User,
) -> Result<Vec<Booking>, AppError> {
    Ok(store.bookings_for_vendor(vendor.id).await?)
}

/// Vendor (or admin) accepts or rejects a pending booking. Only pending
/// bookings can be reviewed; accepted is the gate to payment.
pub async fn review_booking(
    store: &dyn MarketStore,
    user: &User,
    booking_id: Uuid,
    accept: bool,
) -> Result<Booking, AppError> {
    let booking = store
        .booking_by_id(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking '{booking_id}' was not found")))?;

    let ticket = store
        .ticket_by_id(booking.ticket_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Ticket '{}' was not found", booking.ticket_id))
        })?;

    if ticket.vendor_id != user.id && user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only the listing vendor can review this booking".to_string(),
        ));
    }

    let to = if accept {
        BookingStatus::Accepted
    } else {
        BookingStatus::Rejected
    };

    let transitioned = store
        .transition_booking(booking.id, BookingStatus::Pending, to)
        .await?;
    if !transitioned {
        return Err(AppError::InvalidState(
            "Only pending bookings can be reviewed".to_string(),
        ));
    }

    store
        .booking_by_id(booking.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking '{booking_id}' was not found")))
}
