//! Dummy payment provider implementation
//!
//! Issues payment intents without contacting any processor. The intent's amount, currency and
//! metadata are encoded in its ID, so a later retrieval reproduces them without shared state.
//! Useful for testing and development purposes.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    config::DummyConfig,
    payment_providers::{
        CreatePaymentIntent, PaymentError, PaymentIntent, PaymentIntentStatus, PaymentProvider, Result, WebhookEvent, parse_webhook_body,
    },
};

const ID_PREFIX: &str = "pi_dummy_";

/// Dummy payment provider whose intents are confirmed immediately
pub struct DummyProvider {
    succeed_payments: bool,
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self::new(config.succeed_payments)
    }
}

/// What the dummy intent ID carries
#[derive(Debug, Serialize, Deserialize)]
struct EncodedIntent {
    amount: i64,
    currency: String,
    metadata: HashMap<String, String>,
}

impl DummyProvider {
    pub fn new(succeed_payments: bool) -> Self {
        Self { succeed_payments }
    }

    fn status(&self) -> PaymentIntentStatus {
        if self.succeed_payments {
            PaymentIntentStatus::Succeeded
        } else {
            PaymentIntentStatus::RequiresPaymentMethod
        }
    }

    fn decode_id(payment_intent_id: &str) -> Result<EncodedIntent> {
        let invalid = || PaymentError::InvalidData("Invalid dummy payment intent ID format".to_string());

        // Format: pi_dummy_{nonce}_{base64url(json)}
        let rest = payment_intent_id.strip_prefix(ID_PREFIX).ok_or_else(invalid)?;
        let (_nonce, payload) = rest.split_once('_').ok_or_else(invalid)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid())
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent> {
        let encoded = EncodedIntent {
            amount: request.amount,
            currency: request.currency.to_lowercase(),
            metadata: request.metadata.iter().cloned().collect(),
        };
        let payload = serde_json::to_vec(&encoded).map_err(|e| PaymentError::InvalidData(e.to_string()))?;
        let id = format!("{ID_PREFIX}{}_{}", uuid::Uuid::new_v4().simple(), URL_SAFE_NO_PAD.encode(payload));

        tracing::info!("Dummy provider created payment intent for {} {}", encoded.amount, encoded.currency);

        Ok(PaymentIntent {
            client_secret: Some(format!("{id}_secret_dummy")),
            id,
            amount: encoded.amount,
            currency: encoded.currency,
            status: PaymentIntentStatus::RequiresPaymentMethod,
            metadata: encoded.metadata,
        })
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        let encoded = Self::decode_id(payment_intent_id)?;
        Ok(PaymentIntent {
            id: payment_intent_id.to_string(),
            client_secret: None,
            amount: encoded.amount,
            currency: encoded.currency,
            status: self.status(),
            metadata: encoded.metadata,
        })
    }

    async fn validate_webhook(&self, _headers: &axum::http::HeaderMap, body: &str) -> Result<Option<WebhookEvent>> {
        // Unsigned: the dummy processor has no signing secret
        Ok(Some(parse_webhook_body(body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePaymentIntent {
        CreatePaymentIntent {
            amount: 29700,
            currency: "USD".to_string(),
            metadata: vec![
                ("source".to_string(), "BraveFx_Checkout".to_string()),
                ("coupon_code".to_string(), "LAUNCH_50".to_string()),
            ],
        }
    }

    #[tokio::test]
    async fn test_intent_roundtrips_through_id() {
        let provider = DummyProvider::new(true);
        let created = provider.create_payment_intent(&request()).await.unwrap();
        assert!(created.id.starts_with(ID_PREFIX));
        assert!(created.client_secret.as_deref().unwrap().starts_with(&created.id));

        let retrieved = provider.retrieve_payment_intent(&created.id).await.unwrap();
        assert!(retrieved.is_succeeded());
        assert_eq!(retrieved.amount, 29700);
        assert_eq!(retrieved.currency, "usd");
        assert_eq!(retrieved.metadata_value("coupon_code"), Some("LAUNCH_50"));
    }

    #[tokio::test]
    async fn test_intents_are_unique() {
        let provider = DummyProvider::new(true);
        let a = provider.create_payment_intent(&request()).await.unwrap();
        let b = provider.create_payment_intent(&request()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_declining_provider() {
        let provider = DummyProvider::new(false);
        let created = provider.create_payment_intent(&request()).await.unwrap();
        let retrieved = provider.retrieve_payment_intent(&created.id).await.unwrap();
        assert_eq!(retrieved.status, PaymentIntentStatus::RequiresPaymentMethod);
    }

    #[tokio::test]
    async fn test_rejects_foreign_ids() {
        let provider = DummyProvider::new(true);
        for id in ["pi_3Nx", "pi_dummy_", "pi_dummy_abc_!!!"] {
            assert!(matches!(
                provider.retrieve_payment_intent(id).await,
                Err(PaymentError::InvalidData(_))
            ));
        }
    }
}
