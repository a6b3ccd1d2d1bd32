use axum::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, ModerationStatus, Ticket, Transaction, TransportMode, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Sort order for ticket listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TicketSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// Filter for browsing/listing tickets. `skip`/`limit` paginate the result.
#[derive(Debug, Clone)]
pub struct TicketFilter {
    pub status: Option<ModerationStatus>,
    pub vendor_id: Option<Uuid>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub mode: Option<TransportMode>,
    pub advertised: Option<bool>,
    pub sort: TicketSort,
    pub skip: i64,
    pub limit: i64,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self {
            status: None,
            vendor_id: None,
            origin: None,
            destination: None,
            mode: None,
            advertised: None,
            sort: TicketSort::Newest,
            skip: 0,
            limit: 20,
        }
    }
}

/// Fields a vendor may change on an existing listing. `None` leaves the
/// current value untouched. Existing bookings keep their snapshotted prices.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub mode: Option<TransportMode>,
    pub price: Option<Decimal>,
    pub available_quantity: Option<i32>,
}

/// Persistence contract for the marketplace collections.
///
/// Everything the handlers touch goes through this trait so the core
/// workflow can be exercised against [`MemStore`] in tests while production
/// runs on [`PgStore`]. The only operation that must be a true atomic
/// read-modify-write is [`try_decrement_quantity`](Self::try_decrement_quantity);
/// every other multi-step sequence tolerates interleaving.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // users
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn user_by_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError>;
    async fn set_user_fraudulent(&self, id: Uuid) -> Result<bool, StoreError>;

    // tickets
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;
    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;
    async fn update_ticket(
        &self,
        id: Uuid,
        update: &TicketUpdate,
    ) -> Result<Option<Ticket>, StoreError>;
    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<bool, StoreError>;
    /// Fraud cascade: rejects every listing owned by the vendor, whatever
    /// its prior status. Returns the number of listings affected.
    async fn reject_tickets_for_vendor(&self, vendor_id: Uuid) -> Result<u64, StoreError>;
    async fn set_ticket_advertised(&self, id: Uuid, advertised: bool) -> Result<bool, StoreError>;
    async fn count_advertised(&self) -> Result<i64, StoreError>;
    /// Conditional decrement: subtracts `by` from `available_quantity` only
    /// if at least `by` units remain, as a single atomic operation. Returns
    /// whether the decrement was applied.
    async fn try_decrement_quantity(&self, id: Uuid, by: i32) -> Result<bool, StoreError>;
    /// Returns previously reserved units, e.g. when a duplicate confirmation
    /// loses the settlement race after decrementing.
    async fn increment_quantity(&self, id: Uuid, by: i32) -> Result<bool, StoreError>;
    async fn delete_ticket(&self, id: Uuid) -> Result<bool, StoreError>;

    // bookings
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
    async fn booking_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;
    async fn bookings_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Booking>, StoreError>;
    async fn bookings_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<Booking>, StoreError>;
    /// Conditional transition: applied only if the booking is currently in
    /// `from`. Returns whether the transition happened.
    async fn transition_booking(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, StoreError>;
    async fn set_booking_session(&self, id: Uuid, session_id: &str) -> Result<bool, StoreError>;
    /// Marks an `accepted` booking paid, recording the transaction reference
    /// and payment timestamp. Conditional on the current status so duplicate
    /// confirmations cannot double-apply.
    async fn mark_booking_paid(
        &self,
        id: Uuid,
        transaction_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    // transactions
    async fn insert_transaction(&self, txn: &Transaction) -> Result<(), StoreError>;
    async fn transactions_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<Transaction>, StoreError>;
    async fn list_transactions(&self, skip: i64, limit: i64) -> Result<Vec<Transaction>, StoreError>;
}
