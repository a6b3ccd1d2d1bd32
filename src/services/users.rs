use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::store::MarketStore;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Registers a new account and mints its opaque bearer credential.
/// A duplicate email is a 409 conflict.
pub async fn register(
    store: &dyn MarketStore,
    input: RegisterInput,
) -> Result<(User, String), AppError> {
    let name = input.name.trim();
    let email = input.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(AppError::ValidationError("Name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::ValidationError(format!(
            "'{email}' is not a valid email address"
        )));
    }
    if input.role == Role::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let token = format!("fp_{}", Uuid::new_v4().simple());
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        role: input.role,
        fraudulent: false,
        api_token: token.clone(),
        created_at: now,
        updated_at: now,
    };

    store.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, role = ?user.role, "User registered");

    Ok((user, token))
}

pub async fn list_users(
    store: &dyn MarketStore,
    skip: i64,
    limit: i64,
) -> Result<Vec<User>, AppError> {
    Ok(store.list_users(skip, limit.clamp(1, 100)).await?)
}
