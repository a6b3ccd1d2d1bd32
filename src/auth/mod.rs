use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Resolves the bearer credential to a verified user and stashes it in the
/// request extensions for downstream handlers. The identity provider itself
/// is a black box; all this layer guarantees is "a verified user or 401".
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)?;
    let user = state
        .store
        .user_by_token(&token)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid or expired credential".to_string()))?;

    if user.fraudulent {
        return Err(AppError::Forbidden(
            "This account has been flagged and suspended".to_string(),
        ));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Role guard applied declaratively per route group via `route_layer`.
/// Admins pass every guard.
pub async fn require_vendor(req: Request, next: Next) -> Result<Response, AppError> {
    authorize(&req, Role::Vendor)?;
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    authorize(&req, Role::Admin)?;
    Ok(next.run(req).await)
}

fn authorize(req: &Request, required: Role) -> Result<(), AppError> {
    let user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| AppError::AuthError("Missing authenticated identity".to_string()))?;

    if user.role == required || user.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "This operation requires the {:?} role",
            required
        )))
    }
}

fn bearer_token(req: &Request) -> Result<String, AppError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::AuthError("Missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::AuthError("Expected a bearer token".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    use super::*;

    fn request_with_auth(value: &str) -> Request {
        HttpRequest::builder()
            .uri("/")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn extracts_bearer_token() {
        let req = request_with_auth("Bearer tok-abc");
        assert_eq!(bearer_token(&req).unwrap(), "tok-abc");
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        assert!(bearer_token(&req).is_err());

        let req = request_with_auth("Basic dXNlcg==");
        assert!(bearer_token(&req).is_err());

        let req = request_with_auth("Bearer ");
        assert!(bearer_token(&req).is_err());
    }
}
