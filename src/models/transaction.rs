use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

/// Append-only settlement record. One row per settlement attempt, success or
/// failure, never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub buyer_id: Uuid,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
