//! Inbound webhooks: payment processor events and enrollment row notifications.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};

use crate::{
    AppState,
    api::models::webhooks::{EnrollmentWebhookPayload, WebhookAck, WelcomeEmailResponse},
    email,
    errors::Error,
    payment_providers::PaymentError,
};

/// Receive a payment processor event
///
/// The signature is checked by the configured provider. Succeeded and failed payment intents
/// update the recorded payment; other events are acknowledged and ignored.
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    tag = "webhooks",
    request_body(content = String, description = "Raw event body as sent by the processor"),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Invalid signature or malformed event"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn payment_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<WebhookAck>, Error> {
    let body = std::str::from_utf8(&body).map_err(|_| PaymentError::InvalidData("Webhook body is not UTF-8".to_string()))?;

    let Some(event) = state.payment_provider.validate_webhook(&headers, body).await? else {
        tracing::debug!("Payment provider {} does not handle webhooks", state.payment_provider.name());
        return Ok(Json(WebhookAck { received: true }));
    };

    tracing::info!("Received payment webhook event: {}", event.event_type);
    state.payment_provider.process_webhook_event(&state.db, &event).await?;

    Ok(Json(WebhookAck { received: true }))
}

/// Whether the request carries the configured enrollment webhook secret
fn has_enrollment_secret(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token.trim() == secret)
}

/// Send the welcome email for a newly inserted enrollment
#[utoipa::path(
    post,
    path = "/webhooks/enrollments",
    tag = "webhooks",
    request_body = EnrollmentWebhookPayload,
    responses(
        (status = 200, description = "Email sent, or payload skipped", body = WelcomeEmailResponse),
        (status = 400, description = "Enrollment insert without a usable record"),
        (status = 401, description = "Missing or wrong shared secret"),
        (status = 500, description = "Email could not be sent", body = WelcomeEmailResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn enrollment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EnrollmentWebhookPayload>,
) -> Result<(StatusCode, Json<WelcomeEmailResponse>), Error> {
    if let Some(secret) = state.config.webhooks.enrollment_secret.as_deref()
        && !has_enrollment_secret(&headers, secret)
    {
        return Err(Error::Unauthenticated {
            message: Some("Invalid webhook secret".to_string()),
        });
    }

    if !payload.is_enrollment_insert() {
        tracing::debug!("Skipping {} on {}", payload.event_type, payload.table);
        return Ok((StatusCode::OK, Json(WelcomeEmailResponse::skipped())));
    }
    if !state.config.webhooks.send_welcome_email {
        tracing::debug!("Welcome emails are sent at checkout, skipping enrollment webhook");
        return Ok((StatusCode::OK, Json(WelcomeEmailResponse::skipped())));
    }

    let record = payload.enrollment_record().map_err(|e| Error::BadRequest {
        message: format!("Malformed enrollment record: {e}"),
    })?;
    match email::send_enrollment_welcome(&state.db, &state.mailer, record.user_id, record.course_id).await {
        Ok(email_id) => Ok((StatusCode::OK, Json(WelcomeEmailResponse::sent(email_id)))),
        Err(e) => {
            tracing::error!("Failed to send welcome email for enrollment {}: {}", record.id, e);
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(WelcomeEmailResponse::failed(e.user_message()))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::test::utils::{create_test_app, create_test_app_with_config, create_test_config, create_test_course, create_test_user};
    use serde_json::{Value, json};
    use sqlx::PgPool;

    /// Welcome emails go out from the webhook rather than checkout
    fn webhook_email_config() -> Config {
        let mut config = create_test_config();
        config.checkout.send_welcome_email = false;
        config.webhooks.send_welcome_email = true;
        config
    }

    fn insert_payload(user_id: uuid::Uuid, course_id: uuid::Uuid) -> Value {
        json!({
            "type": "INSERT",
            "table": "enrollments",
            "record": {
                "id": uuid::Uuid::new_v4(),
                "user_id": user_id,
                "course_id": course_id,
                "created_at": "2025-01-01T00:00:00Z"
            }
        })
    }

    #[test]
    fn test_enrollment_secret_header() {
        let mut headers = HeaderMap::new();
        assert!(!has_enrollment_secret(&headers, "s3cret"));
        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert!(has_enrollment_secret(&headers, "s3cret"));
        headers.insert(header::AUTHORIZATION, "Bearer other".parse().unwrap());
        assert!(!has_enrollment_secret(&headers, "s3cret"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enrollment_webhook_sends_welcome(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = webhook_email_config();
        config.email.transport = crate::config::EmailTransportConfig::File {
            path: dir.path().to_string_lossy().to_string(),
        };
        let server = create_test_app_with_config(pool, config).await;

        let response = server.post("/webhooks/enrollments").json(&insert_payload(user.id, course.id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert!(body["emailId"].is_string());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enrollment_webhook_skips_and_fails(pool: PgPool) {
        let server = create_test_app_with_config(pool, webhook_email_config()).await;

        let mut update = insert_payload(uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        update["type"] = json!("UPDATE");
        let body: Value = server.post("/webhooks/enrollments").json(&update).await.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["skipped"], true);

        let response = server
            .post("/webhooks/enrollments")
            .json(&insert_payload(uuid::Uuid::new_v4(), uuid::Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enrollment_webhook_skips_other_rows(pool: PgPool) {
        let server = create_test_app_with_config(pool, webhook_email_config()).await;

        let payloads = [
            json!({"type": "UPDATE", "table": "profiles", "record": {"id": uuid::Uuid::new_v4(), "full_name": "Trader"}}),
            json!({"type": "DELETE", "table": "enrollments", "record": null, "old_record": {"id": uuid::Uuid::new_v4()}}),
            json!({"type": "INSERT", "table": "reviews"}),
        ];
        for payload in payloads {
            let response = server.post("/webhooks/enrollments").json(&payload).await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["success"], true);
            assert_eq!(body["skipped"], true);
        }

        let response = server
            .post("/webhooks/enrollments")
            .json(&json!({"type": "INSERT", "table": "enrollments", "record": {"id": uuid::Uuid::new_v4()}}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enrollment_webhook_defers_to_checkout_email(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let server = create_test_app(pool).await;

        let body: Value = server
            .post("/webhooks/enrollments")
            .json(&insert_payload(user.id, course.id))
            .await
            .json();
        assert_eq!(body["success"], true);
        assert_eq!(body["skipped"], true);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enrollment_webhook_secret(pool: PgPool) {
        let mut config = create_test_config();
        config.webhooks.enrollment_secret = Some("s3cret".to_string());
        let server = create_test_app_with_config(pool, config).await;

        let mut update = insert_payload(uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        update["type"] = json!("DELETE");

        server
            .post("/webhooks/enrollments")
            .json(&update)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/webhooks/enrollments")
            .add_header("authorization", "Bearer s3cret")
            .json(&update)
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_payment_webhook_updates_status(pool: PgPool) {
        let course = create_test_course(&pool, "Forex Basics").await;
        let server = create_test_app(pool.clone()).await;

        let intent: Value = server
            .post("/api/v1/checkout/payment-intent")
            .json(&json!({"courseId": course.id}))
            .await
            .json();
        let intent_id = intent["clientSecret"].as_str().unwrap().trim_end_matches("_secret_dummy").to_string();
        server
            .post("/api/v1/checkout/complete")
            .json(&json!({
                "email": "buyer@example.com",
                "password": "password123",
                "fullName": "Buyer",
                "agreedToTerms": true,
                "paymentIntentId": intent_id,
                "courseId": course.id,
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let event = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": intent_id, "object": "payment_intent"}}
        });
        for _ in 0..2 {
            let ack: Value = server.post("/webhooks/payments").text(event.to_string()).await.json();
            assert_eq!(ack["received"], true);
        }

        let status: String = sqlx::query_scalar("SELECT status FROM payments WHERE payment_intent_id = $1")
            .bind(&intent_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "succeeded");

        let ignored = json!({"type": "customer.created", "data": {"object": {"id": "cus_1", "object": "customer"}}});
        server
            .post("/webhooks/payments")
            .text(ignored.to_string())
            .await
            .assert_status_ok();
        server.post("/webhooks/payments").text("not json").await.assert_status(StatusCode::BAD_REQUEST);
    }
}
