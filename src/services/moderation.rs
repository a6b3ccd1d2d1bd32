use uuid::Uuid;

use crate::models::ticket::MAX_ADVERTISED;
use crate::models::{ModerationStatus, Ticket, User};
use crate::store::MarketStore;
use crate::utils::error::AppError;

/// Admin approves or rejects a listing.
pub async fn review_ticket(
    store: &dyn MarketStore,
    ticket_id: Uuid,
    approve: bool,
) -> Result<Ticket, AppError> {
    let status = if approve {
        ModerationStatus::Approved
    } else {
        ModerationStatus::Rejected
    };

    let updated = store.set_ticket_status(ticket_id, status).await?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "Ticket '{ticket_id}' was not found"
        )));
    }

    tracing::info!(ticket_id = %ticket_id, status = ?status, "Listing moderated");

    store
        .ticket_by_id(ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{ticket_id}' was not found")))
}

/// Toggles the advertised flag, capping concurrent advertisements at
/// [`MAX_ADVERTISED`]. The count-then-set is approximate: it is subject to
/// the same soft-check race as booking creation, and that is accepted.
pub async fn set_advertised(
    store: &dyn MarketStore,
    ticket_id: Uuid,
    advertised: bool,
) -> Result<Ticket, AppError> {
    let ticket = store
        .ticket_by_id(ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{ticket_id}' was not found")))?;

    if advertised && !ticket.advertised {
        if ticket.status != ModerationStatus::Approved {
            return Err(AppError::InvalidState(
                "Only approved listings can be advertised".to_string(),
            ));
        }
        let count = store.count_advertised().await?;
        if count >= MAX_ADVERTISED {
            return Err(AppError::ValidationError(format!(
                "Maximum {MAX_ADVERTISED} tickets can be advertised at a time"
            )));
        }
    }

    store.set_ticket_advertised(ticket_id, advertised).await?;

    store
        .ticket_by_id(ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{ticket_id}' was not found")))
}

/// Flags a user as fraudulent and cascades a rejection over every listing
/// they own, whatever its prior status.
pub async fn mark_fraudulent(
    store: &dyn MarketStore,
    user_id: Uuid,
) -> Result<(User, u64), AppError> {
    let flagged = store.set_user_fraudulent(user_id).await?;
    if !flagged {
        return Err(AppError::NotFound(format!(
            "User '{user_id}' was not found"
        )));
    }

    let rejected = store.reject_tickets_for_vendor(user_id).await?;

    tracing::warn!(
        user_id = %user_id,
        listings_rejected = rejected,
        "User flagged as fraudulent"
    );

    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{user_id}' was not found")))?;

    Ok((user, rejected))
}
