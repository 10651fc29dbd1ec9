//! Payment provider abstraction layer
//!
//! The [`PaymentProvider`] trait covers what the checkout flow needs from a card processor:
//! creating a payment intent for a verified amount, reading it back once the browser has
//! confirmed it, and validating the processor's webhooks.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::{
    config::PaymentConfig,
    db::{
        errors::DbError,
        handlers::Payments,
        models::payments::{PAYMENT_STATUS_FAILED, PAYMENT_STATUS_SUCCEEDED},
    },
};

pub mod dummy;
pub mod stripe;

/// Create a payment provider from configuration
pub fn create_provider(config: PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Stripe(stripe_config) => Box::new(stripe::StripeProvider::from(stripe_config)),
        PaymentConfig::Dummy(dummy_config) => Box::new(dummy::DummyProvider::from(dummy_config)),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment processing
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Payment not completed yet")]
    PaymentNotCompleted,

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::PaymentNotCompleted => StatusCode::PAYMENT_REQUIRED,
            PaymentError::InvalidData(_) | PaymentError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            PaymentError::ProviderApi(_) => StatusCode::BAD_GATEWAY,
            PaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::PaymentNotCompleted => "Payment has not been completed".to_string(),
            PaymentError::InvalidData(message) => message.clone(),
            PaymentError::InvalidSignature(_) => "Invalid webhook signature".to_string(),
            PaymentError::ProviderApi(_) => "Payment provider is unavailable, please try again".to_string(),
            PaymentError::Database(_) => "Internal server error".to_string(),
        }
    }
}

/// Lifecycle state of a payment intent, as reported by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl PaymentIntentStatus {
    /// Parse a processor status string such as `requires_payment_method`
    pub fn from_processor(status: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(status.to_string())).unwrap_or(Self::Unknown)
    }
}

/// Parameters for a new payment intent
#[derive(Debug, Clone)]
pub struct CreatePaymentIntent {
    /// Amount in the smallest currency unit (cents)
    pub amount: i64,
    pub currency: String,
    pub metadata: Vec<(String, String)>,
}

/// A payment intent as returned by the processor
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentIntentStatus::Succeeded
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Webhook event types the service reacts to
pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Represents a webhook event from a payment provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Type of event (e.g., "payment_intent.succeeded")
    pub event_type: String,
    /// Payment intent the event refers to, if any
    pub payment_intent_id: Option<String>,
}

/// Minimal shape shared by processor webhook bodies: `{type, data: {object: {id}}}`
#[derive(Debug, Deserialize)]
struct RawWebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: Option<RawWebhookData>,
}

#[derive(Debug, Deserialize)]
struct RawWebhookData {
    object: Option<RawWebhookObject>,
}

#[derive(Debug, Deserialize)]
struct RawWebhookObject {
    id: Option<String>,
    object: Option<String>,
}

/// Parse the event type and payment intent id out of a webhook body
pub(crate) fn parse_webhook_body(body: &str) -> Result<WebhookEvent> {
    let raw: RawWebhookEvent =
        serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(format!("Malformed webhook body: {e}")))?;

    let payment_intent_id = raw
        .data
        .and_then(|d| d.object)
        .filter(|o| o.object.as_deref().is_none_or(|kind| kind == "payment_intent"))
        .and_then(|o| o.id);

    Ok(WebhookEvent {
        event_type: raw.event_type,
        payment_intent_id,
    })
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Value written to `payments.payment_method`
    fn name(&self) -> &'static str;

    /// Create a payment intent for an amount the server has already verified.
    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent>;

    /// Fetch a payment intent from the processor.
    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent>;

    /// Validate and extract webhook event from raw request data
    ///
    /// Returns None if this provider doesn't support webhooks.
    /// Returns Err if validation fails (invalid signature, malformed data, etc.)
    async fn validate_webhook(&self, headers: &axum::http::HeaderMap, body: &str) -> Result<Option<WebhookEvent>>;

    /// Apply a validated webhook event to the recorded payment.
    ///
    /// Idempotent: replays leave the payment row unchanged. Unhandled event types and unknown
    /// payment intents are ignored.
    async fn process_webhook_event(&self, db_pool: &PgPool, event: &WebhookEvent) -> Result<()> {
        let status = match event.event_type.as_str() {
            EVENT_PAYMENT_SUCCEEDED => PAYMENT_STATUS_SUCCEEDED,
            EVENT_PAYMENT_FAILED => PAYMENT_STATUS_FAILED,
            other => {
                tracing::debug!("Ignoring webhook event type: {}", other);
                return Ok(());
            }
        };

        let Some(payment_intent_id) = event.payment_intent_id.as_deref() else {
            tracing::warn!("Webhook event {} carries no payment intent id", event.event_type);
            return Ok(());
        };

        let mut conn = db_pool.acquire().await.map_err(DbError::from)?;
        let updated = Payments::new(&mut conn)
            .set_status_by_intent(payment_intent_id, status)
            .await?;

        match updated {
            Some(payment) => tracing::info!("Payment {} for intent {} marked {}", payment.id, payment_intent_id, status),
            None => tracing::debug!("No recorded payment for intent {}, nothing to update", payment_intent_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payment_intent_event() {
        let body = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123","object":"payment_intent"}}}"#;
        let event = parse_webhook_body(body).unwrap();
        assert_eq!(event.event_type, EVENT_PAYMENT_SUCCEEDED);
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_parse_other_object_has_no_intent() {
        let body = r#"{"type":"charge.refunded","data":{"object":{"id":"ch_1","object":"charge"}}}"#;
        let event = parse_webhook_body(body).unwrap();
        assert_eq!(event.payment_intent_id, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_webhook_body("not json"), Err(PaymentError::InvalidData(_))));
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: PaymentIntentStatus = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(status, PaymentIntentStatus::Unknown);
        assert_eq!(PaymentIntentStatus::from_processor("succeeded"), PaymentIntentStatus::Succeeded);
        assert_eq!(
            PaymentIntentStatus::from_processor("requires_payment_method"),
            PaymentIntentStatus::RequiresPaymentMethod
        );
        assert_eq!(PaymentIntentStatus::from_processor("something_new"), PaymentIntentStatus::Unknown);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PaymentError::PaymentNotCompleted.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            PaymentError::InvalidSignature("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
