use axum::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod http;
pub mod mock;

pub use http::HttpGateway;
pub use mock::MockGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("unknown checkout session: {0}")]
    UnknownSession(String),

    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

/// What the gateway reports about a session's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Amount in minor units (e.g. pence/cents).
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Carried as opaque session metadata; comes back on retrieval and is
    /// how settlement locates the booking.
    pub booking_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub payment_status: PaymentStatus,
    pub booking_id: Uuid,
}

/// Card-payment gateway contract.
///
/// Abstraction over hosted-checkout processors. Production talks to the real
/// service through [`HttpGateway`]; development and tests run against
/// [`MockGateway`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError>;
}
