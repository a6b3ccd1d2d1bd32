use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::models::{ModerationStatus, User};
use crate::services::{moderation, tickets, users};
use crate::state::AppState;
use crate::store::TicketFilter;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Debug, Deserialize, Default)]
pub struct ModerationQuery {
    pub status: Option<ModerationStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdvertiseInput {
    pub advertised: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<Response, AppError> {
    let filter = TicketFilter {
        status: query.status,
        skip: query.skip.unwrap_or(0).max(0),
        limit: query.limit.unwrap_or(20).clamp(1, 100),
        ..Default::default()
    };
    let found = state.store.list_tickets(&filter).await?;
    Ok(success(found, "Tickets retrieved").into_response())
}

pub async fn approve_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = moderation::review_ticket(state.store.as_ref(), id, true).await?;
    Ok(success(ticket, "Listing approved").into_response())
}

pub async fn reject_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = moderation::review_ticket(state.store.as_ref(), id, false).await?;
    Ok(success(ticket, "Listing rejected").into_response())
}

pub async fn set_advertised(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AdvertiseInput>,
) -> Result<Response, AppError> {
    let ticket = moderation::set_advertised(state.store.as_ref(), id, input.advertised).await?;
    let message = if input.advertised {
        "Listing advertised"
    } else {
        "Listing no longer advertised"
    };
    Ok(success(ticket, message).into_response())
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    tickets::delete_listing(state.store.as_ref(), &user, id).await?;
    Ok(empty_success("Listing deleted").into_response())
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let found = users::list_users(
        state.store.as_ref(),
        query.skip.unwrap_or(0).max(0),
        query.limit.unwrap_or(20),
    )
    .await?;
    Ok(success(found, "Users retrieved").into_response())
}

pub async fn mark_fraudulent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (user, rejected) = moderation::mark_fraudulent(state.store.as_ref(), id).await?;
    Ok(success(
        json!({ "user": user, "listingsRejected": rejected }),
        "User flagged as fraudulent",
    )
    .into_response())
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let found = state
        .store
        .list_transactions(
            query.skip.unwrap_or(0).max(0),
            query.limit.unwrap_or(20).clamp(1, 100),
        )
        .await?;
    Ok(success(found, "Transactions retrieved").into_response())
}
