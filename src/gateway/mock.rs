use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::async_trait;
use uuid::Uuid;

use super::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, PaymentStatus, SessionStatus,
};

/// In-memory gateway for development and tests. Sessions start `Pending`;
/// tests (or a curious operator poking a dev deployment) flip them with
/// [`MockGateway::set_payment_status`].
#[derive(Default)]
pub struct MockGateway {
    sessions: Mutex<HashMap<String, SessionStatus>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionStatus>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates the asynchronous payment outcome the real gateway would
    /// report. Returns false if the session does not exist.
    pub fn set_payment_status(&self, session_id: &str, status: PaymentStatus) -> bool {
        match self.lock().get_mut(session_id) {
            Some(session) => {
                session.payment_status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let id = format!("cs_mock_{}", Uuid::new_v4());
        self.lock().insert(
            id.clone(),
            SessionStatus {
                payment_status: PaymentStatus::Pending,
                booking_id: request.booking_id,
            },
        );

        tracing::info!(
            session_id = %id,
            amount_minor = request.amount_minor,
            booking_id = %request.booking_id,
            "Mock checkout session created"
        );

        Ok(CheckoutSession {
            url: format!("https://checkout.invalid/pay/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        self.lock()
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownSession(session_id.to_string()))
    }
}
