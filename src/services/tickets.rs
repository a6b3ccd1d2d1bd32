use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{ModerationStatus, Role, Ticket, TransportMode, User};
use crate::store::{MarketStore, TicketFilter, TicketSort, TicketUpdate};
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub origin: String,
    pub destination: String,
    pub mode: TransportMode,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingUpdate {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub mode: Option<TransportMode>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

/// Query parameters for the public browse endpoint. Only approved listings
/// are ever visible here.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrowseQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub mode: Option<TransportMode>,
    pub sort: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// New listings always start in moderation; only an admin approval makes
/// them bookable.
pub async fn create_listing(
    store: &dyn MarketStore,
    vendor: &User,
    input: NewListing,
) -> Result<Ticket, AppError> {
    validate_route(&input.origin, &input.destination)?;
    validate_price(input.price)?;
    if input.quantity < 0 {
        return Err(AppError::ValidationError(
            "Quantity must not be negative".to_string(),
        ));
    }

    let now = Utc::now();
    let ticket = Ticket {
        id: Uuid::new_v4(),
        vendor_id: vendor.id,
        vendor_name: vendor.name.clone(),
        vendor_email: vendor.email.clone(),
        origin: input.origin.trim().to_string(),
        destination: input.destination.trim().to_string(),
        mode: input.mode,
        price: input.price,
        available_quantity: input.quantity,
        status: ModerationStatus::Pending,
        advertised: false,
        created_at: now,
        updated_at: now,
    };

    store.insert_ticket(&ticket).await?;
    tracing::info!(ticket_id = %ticket.id, vendor_id = %vendor.id, "Listing created");

    Ok(ticket)
}

pub async fn my_listings(store: &dyn MarketStore, vendor: &User) -> Result<Vec<Ticket>, AppError> {
    let filter = TicketFilter {
        vendor_id: Some(vendor.id),
        limit: 100,
        ..Default::default()
    };
    Ok(store.list_tickets(&filter).await?)
}

/// Edits never touch existing bookings: their unit price was snapshotted at
/// booking time.
pub async fn update_listing(
    store: &dyn MarketStore,
    user: &User,
    ticket_id: Uuid,
    input: ListingUpdate,
) -> Result<Ticket, AppError> {
    let ticket = require_owned(store, user, ticket_id).await?;

    if let Some(price) = input.price {
        validate_price(price)?;
    }
    if let Some(quantity) = input.quantity {
        if quantity < 0 {
            return Err(AppError::ValidationError(
                "Quantity must not be negative".to_string(),
            ));
        }
    }

    let update = TicketUpdate {
        origin: input.origin,
        destination: input.destination,
        mode: input.mode,
        price: input.price,
        available_quantity: input.quantity,
    };

    store
        .update_ticket(ticket.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{ticket_id}' was not found")))
}

pub async fn delete_listing(
    store: &dyn MarketStore,
    user: &User,
    ticket_id: Uuid,
) -> Result<(), AppError> {
    let ticket = require_owned(store, user, ticket_id).await?;
    store.delete_ticket(ticket.id).await?;
    tracing::info!(ticket_id = %ticket.id, deleted_by = %user.id, "Listing deleted");
    Ok(())
}

pub async fn browse(store: &dyn MarketStore, query: BrowseQuery) -> Result<Vec<Ticket>, AppError> {
    let sort = match query.sort.as_deref() {
        None | Some("newest") => TicketSort::Newest,
        Some("price_asc") => TicketSort::PriceAsc,
        Some("price_desc") => TicketSort::PriceDesc,
        Some(other) => {
            return Err(AppError::ValidationError(format!(
                "Unknown sort '{other}'; expected newest, price_asc or price_desc"
            )))
        }
    };

    let filter = TicketFilter {
        status: Some(ModerationStatus::Approved),
        origin: query.origin,
        destination: query.destination,
        mode: query.mode,
        sort,
        skip: query.skip.unwrap_or(0).max(0),
        limit: query.limit.unwrap_or(20).clamp(1, 100),
        ..Default::default()
    };

    Ok(store.list_tickets(&filter).await?)
}

pub async fn get_public_ticket(store: &dyn MarketStore, id: Uuid) -> Result<Ticket, AppError> {
    let ticket = store
        .ticket_by_id(id)
        .await?
        .filter(|t| t.status == ModerationStatus::Approved)
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))?;
    Ok(ticket)
}

pub async fn advertised(store: &dyn MarketStore) -> Result<Vec<Ticket>, AppError> {
    let filter = TicketFilter {
        status: Some(ModerationStatus::Approved),
        advertised: Some(true),
        limit: crate::models::ticket::MAX_ADVERTISED,
        ..Default::default()
    };
    Ok(store.list_tickets(&filter).await?)
}

async fn require_owned(
    store: &dyn MarketStore,
    user: &User,
    ticket_id: Uuid,
) -> Result<Ticket, AppError> {
    let ticket = store
        .ticket_by_id(ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{ticket_id}' was not found")))?;

    if ticket.vendor_id != user.id && user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "You do not own this listing".to_string(),
        ));
    }
    Ok(ticket)
}

fn validate_route(origin: &str, destination: &str) -> Result<(), AppError> {
    if origin.trim().is_empty() || destination.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Origin and destination must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::ValidationError(
            "Price must not be negative".to_string(),
        ));
    }
    Ok(())
}
