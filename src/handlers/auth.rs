use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;

use crate::models::User;
use crate::services::users::{self, RegisterInput};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, AppError> {
    let (user, token) = users::register(state.store.as_ref(), input).await?;
    Ok(created(json!({ "user": user, "token": token }), "Account registered").into_response())
}

pub async fn me(Extension(user): Extension<User>) -> Response {
    success(user, "Authenticated user").into_response()
}
