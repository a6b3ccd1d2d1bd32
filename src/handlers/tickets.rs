use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::models::User;
use crate::services::tickets::{self, BrowseQuery, ListingUpdate, NewListing};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

// Public browse surface

pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Response, AppError> {
    let found = tickets::browse(state.store.as_ref(), query).await?;
    Ok(success(found, "Tickets retrieved").into_response())
}

pub async fn advertised(State(state): State<AppState>) -> Result<Response, AppError> {
    let found = tickets::advertised(state.store.as_ref()).await?;
    Ok(success(found, "Advertised tickets retrieved").into_response())
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = tickets::get_public_ticket(state.store.as_ref(), id).await?;
    Ok(success(ticket, "Ticket retrieved").into_response())
}

// Vendor listing management

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<NewListing>,
) -> Result<Response, AppError> {
    let ticket = tickets::create_listing(state.store.as_ref(), &user, input).await?;
    Ok(created(ticket, "Listing created and queued for moderation").into_response())
}

pub async fn my_listings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Response, AppError> {
    let listings = tickets::my_listings(state.store.as_ref(), &user).await?;
    Ok(success(listings, "Listings retrieved").into_response())
}

pub async fn update_listing(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(input): Json<ListingUpdate>,
) -> Result<Response, AppError> {
    let ticket = tickets::update_listing(state.store.as_ref(), &user, id, input).await?;
    Ok(success(ticket, "Listing updated").into_response())
}

pub async fn delete_listing(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    tickets::delete_listing(state.store.as_ref(), &user, id).await?;
    Ok(empty_success("Listing deleted").into_response())
}
