use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// At most this many listings may carry the advertised flag at once.
pub const MAX_ADVERTISED: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transport_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Bus,
    Train,
    Ferry,
    Flight,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub vendor_email: String,
    pub origin: String,
    pub destination: String,
    pub mode: TransportMode,
    pub price: Decimal,
    pub available_quantity: i32,
    pub status: ModerationStatus,
    pub advertised: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Only approved listings can take bookings.
    pub fn is_bookable(&self) -> bool {
        self.status == ModerationStatus::Approved
    }
}
