use axum::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, PaymentStatus, SessionStatus,
};

/// Hosted-checkout client speaking the Stripe-style sessions API:
/// form-encoded create, JSON responses, metadata echoed back on retrieval.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            secret_key: secret_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct SessionCreated {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct SessionRetrieved {
    payment_status: String,
    metadata: SessionMetadata,
}

#[derive(Deserialize)]
struct SessionMetadata {
    booking_id: Uuid,
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let params = [
            ("amount", request.amount_minor.to_string()),
            ("currency", request.currency.clone()),
            ("description", request.description.clone()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[booking_id]", request.booking_id.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Request(format!(
                "create session returned {}",
                response.status()
            )));
        }

        let created: SessionCreated = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        Ok(CheckoutSession {
            id: created.id,
            url: created.url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.base_url, session_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::UnknownSession(session_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(GatewayError::Request(format!(
                "retrieve session returned {}",
                response.status()
            )));
        }

        let retrieved: SessionRetrieved = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        let payment_status = match retrieved.payment_status.as_str() {
            "paid" | "completed" => PaymentStatus::Completed,
            "unpaid" | "pending" => PaymentStatus::Pending,
            "failed" | "canceled" => PaymentStatus::Failed,
            other => {
                return Err(GatewayError::Malformed(format!(
                    "unexpected payment_status '{other}'"
                )))
            }
        };

        Ok(SessionStatus {
            payment_status,
            booking_id: retrieved.metadata.booking_id,
        })
    }
}
