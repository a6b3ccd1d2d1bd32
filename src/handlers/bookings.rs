use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::models::User;
use crate::services::bookings::{self, CreateBooking};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateBooking>,
) -> Result<Response, AppError> {
    let booking = bookings::create_booking(state.store.as_ref(), &user, input).await?;
    Ok(created(booking, "Booking created").into_response())
}

pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Response, AppError> {
    let found = bookings::my_bookings(state.store.as_ref(), &user).await?;
    Ok(success(found, "Bookings retrieved").into_response())
}

pub async fn vendor_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Response, AppError> {
    let found = bookings::vendor_bookings(state.store.as_ref(), &user).await?;
    Ok(success(found, "Bookings retrieved").into_response())
}

pub async fn accept_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let booking = bookings::review_booking(state.store.as_ref(), &user, id, true).await?;
    Ok(success(booking, "Booking accepted").into_response())
}

pub async fn reject_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let booking = bookings::review_booking(state.store.as_ref(), &user, id, false).await?;
    Ok(success(booking, "Booking rejected").into_response())
}
