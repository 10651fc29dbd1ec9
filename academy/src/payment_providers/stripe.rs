//! Stripe payment provider implementation

use async_trait::async_trait;
use stripe::{
    Client, CreatePaymentIntent as StripeCreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, Currency, EventObject,
    EventType, PaymentIntentId, StripeError, Webhook,
};

use crate::{
    config::StripeConfig,
    payment_providers::{
        CreatePaymentIntent, EVENT_PAYMENT_FAILED, EVENT_PAYMENT_SUCCEEDED, PaymentError, PaymentIntent, PaymentIntentStatus,
        PaymentProvider, Result, WebhookEvent,
    },
};

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe payment provider
pub struct StripeProvider {
    api_key: String,
    webhook_secret: String,
}

impl From<StripeConfig> for StripeProvider {
    fn from(config: StripeConfig) -> Self {
        Self::new(config.api_key, config.webhook_secret)
    }
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(api_key: String, webhook_secret: String) -> Self {
        Self { api_key, webhook_secret }
    }

    /// Get a Stripe client
    fn client(&self) -> Client {
        Client::new(&self.api_key)
    }
}

/// Unknown intents are the caller's mistake; everything else is Stripe being unavailable
fn map_stripe_error(e: StripeError) -> PaymentError {
    match e {
        StripeError::Stripe(request) if request.http_status == 404 => {
            PaymentError::InvalidData(format!("Unknown payment intent: {}", request.message.unwrap_or_default()))
        }
        other => {
            tracing::error!("Stripe request failed: {:?}", other);
            PaymentError::ProviderApi(other.to_string())
        }
    }
}

impl From<stripe::PaymentIntent> for PaymentIntent {
    fn from(intent: stripe::PaymentIntent) -> Self {
        Self {
            id: intent.id.to_string(),
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency.to_string(),
            status: PaymentIntentStatus::from_processor(intent.status.as_str()),
            metadata: intent.metadata,
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent> {
        let client = self.client();

        let currency: Currency = request
            .currency
            .to_lowercase()
            .parse()
            .map_err(|_| PaymentError::InvalidData(format!("Unsupported currency: {}", request.currency)))?;

        let mut params = StripeCreatePaymentIntent::new(request.amount, currency);
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            ..Default::default()
        });
        params.metadata = Some(request.metadata.iter().cloned().collect());

        let intent = stripe::PaymentIntent::create(&client, params).await.map_err(|e| {
            tracing::error!("Failed to create Stripe payment intent: {:?}", e);
            PaymentError::ProviderApi(e.to_string())
        })?;

        tracing::info!("Created Stripe payment intent {} for {} {}", intent.id, intent.amount, intent.currency);
        Ok(PaymentIntent::from(intent))
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        let client = self.client();

        let payment_intent_id: PaymentIntentId = payment_intent_id
            .parse()
            .map_err(|_| PaymentError::InvalidData("Invalid Stripe payment intent ID".to_string()))?;

        let intent = stripe::PaymentIntent::retrieve(&client, &payment_intent_id, &[])
            .await
            .map_err(map_stripe_error)?;

        Ok(PaymentIntent::from(intent))
    }

    async fn validate_webhook(&self, headers: &axum::http::HeaderMap, body: &str) -> Result<Option<WebhookEvent>> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .ok_or_else(|| {
                tracing::error!("Missing stripe-signature header");
                PaymentError::InvalidSignature("missing stripe-signature header".to_string())
            })?
            .to_str()
            .map_err(|e| {
                tracing::error!("Invalid stripe-signature header: {:?}", e);
                PaymentError::InvalidSignature("unreadable stripe-signature header".to_string())
            })?;

        // Checks the HMAC and the timestamp tolerance, then parses the event
        let event = Webhook::construct_event(body, signature, &self.webhook_secret).map_err(|e| {
            tracing::error!("Failed to construct webhook event: {:?}", e);
            PaymentError::InvalidSignature(format!("Webhook validation failed: {e}"))
        })?;

        tracing::trace!("Validated Stripe webhook event: {:?}", event.type_);

        let payment_intent_id = match &event.data.object {
            EventObject::PaymentIntent(intent) => Some(intent.id.to_string()),
            _ => None,
        };
        let event_type = match event.type_ {
            EventType::PaymentIntentSucceeded => EVENT_PAYMENT_SUCCEEDED.to_string(),
            EventType::PaymentIntentPaymentFailed => EVENT_PAYMENT_FAILED.to_string(),
            other => format!("{other:?}"),
        };

        Ok(Some(WebhookEvent {
            event_type,
            payment_intent_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> StripeProvider {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        StripeProvider::new("sk_test_fake".to_string(), "whsec_fake".to_string())
    }

    #[test]
    fn test_stripe_provider_creation() {
        let provider = StripeProvider::from(StripeConfig {
            api_key: "sk_test_fake".to_string(),
            webhook_secret: "whsec_fake".to_string(),
        });

        assert_eq!(provider.api_key, "sk_test_fake");
        assert_eq!(provider.webhook_secret, "whsec_fake");
        assert_eq!(provider.name(), "stripe");
    }

    #[tokio::test]
    async fn test_retrieve_rejects_foreign_ids() {
        // Checkout session ids are not payment intents; rejected before any request is made
        let err = provider().retrieve_payment_intent("cs_test_123").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_validate_webhook_requires_header() {
        let err = provider()
            .validate_webhook(&axum::http::HeaderMap::new(), "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_validate_webhook_rejects_bad_signature() {
        let mut headers = axum::http::HeaderMap::new();
        let now = chrono::Utc::now().timestamp();
        headers.insert(SIGNATURE_HEADER, format!("t={now},v1=deadbeef").parse().unwrap());

        let body = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123","object":"payment_intent"}}}"#;
        let err = provider().validate_webhook(&headers, body).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
