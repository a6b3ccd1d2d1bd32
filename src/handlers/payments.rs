use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::models::User;
use crate::services::payments::{self, CreateSessionInput, SettlementOutcome, VerifyInput};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateSessionInput>,
) -> Result<Response, AppError> {
    let session = payments::create_session(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.config,
        &user,
        input,
    )
    .await?;

    Ok(success(
        json!({ "sessionId": session.id, "url": session.url }),
        "Checkout session created",
    )
    .into_response())
}

pub async fn verify(
    State(state): State<AppState>,
    Json(input): Json<VerifyInput>,
) -> Result<Response, AppError> {
    let outcome = payments::settle(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &input.session_id,
    )
    .await?;

    let message = match &outcome {
        SettlementOutcome::Settled(_) => "Payment verified and booking settled",
        SettlementOutcome::AlreadySettled(_) => "Booking was already settled",
    };
    Ok(success(outcome.booking(), message).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub session_id: String,
}

/// Gateway-delivered event. Only completed-checkout events trigger
/// settlement; everything else is acknowledged and dropped.
pub async fn webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<Response, AppError> {
    if event.event_type != "checkout.session.completed" {
        tracing::debug!(event_type = %event.event_type, "Ignoring gateway event");
        return Ok(empty_success("Event ignored").into_response());
    }

    let outcome = payments::settle(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &event.session_id,
    )
    .await?;

    Ok(success(outcome.booking(), "Event processed").into_response())
}
