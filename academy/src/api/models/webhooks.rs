//! Payloads for inbound webhooks.

use crate::types::{CourseId, EnrollmentId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Row-change notification from the database.
///
/// Any table and change kind is accepted; only enrollment inserts carry a record that is decoded.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrollmentWebhookPayload {
    /// Change kind, e.g. `INSERT`
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub table: String,
    /// The new row; absent or null for deletes
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub record: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrollmentRecord {
    #[schema(value_type = String, format = "uuid")]
    pub id: EnrollmentId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub created_at: Option<String>,
}

impl EnrollmentWebhookPayload {
    /// Only fresh enrollments trigger the welcome email
    pub fn is_enrollment_insert(&self) -> bool {
        self.event_type.eq_ignore_ascii_case("INSERT") && self.table == "enrollments"
    }

    /// Decode the inserted row
    pub fn enrollment_record(&self) -> Result<EnrollmentRecord, serde_json::Error> {
        EnrollmentRecord::deserialize(self.record.as_ref().unwrap_or(&serde_json::Value::Null))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeEmailResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WelcomeEmailResponse {
    pub fn sent(email_id: String) -> Self {
        Self {
            success: true,
            email_id: Some(email_id),
            skipped: None,
            error: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            success: true,
            email_id: None,
            skipped: Some(true),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            email_id: None,
            skipped: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_enrollment_inserts_are_acted_on() {
        let user_id = uuid::Uuid::new_v4();
        let payload: EnrollmentWebhookPayload = serde_json::from_value(serde_json::json!({
            "type": "INSERT",
            "table": "enrollments",
            "record": {
                "id": uuid::Uuid::new_v4(),
                "user_id": user_id,
                "course_id": uuid::Uuid::new_v4(),
                "created_at": "2025-01-01T00:00:00Z"
            }
        }))
        .unwrap();
        assert!(payload.is_enrollment_insert());
        assert_eq!(payload.enrollment_record().unwrap().user_id, user_id);

        let update = EnrollmentWebhookPayload {
            event_type: "UPDATE".to_string(),
            ..payload.clone()
        };
        assert!(!update.is_enrollment_insert());

        let other_table = EnrollmentWebhookPayload {
            table: "payments".to_string(),
            ..payload
        };
        assert!(!other_table.is_enrollment_insert());
    }

    #[test]
    fn test_foreign_rows_and_deletes_parse() {
        let profile_update: EnrollmentWebhookPayload = serde_json::from_value(serde_json::json!({
            "type": "UPDATE",
            "table": "profiles",
            "record": {"id": uuid::Uuid::new_v4(), "full_name": "Trader"}
        }))
        .unwrap();
        assert!(!profile_update.is_enrollment_insert());
        assert!(profile_update.enrollment_record().is_err());

        let delete: EnrollmentWebhookPayload =
            serde_json::from_value(serde_json::json!({"type": "DELETE", "table": "enrollments", "record": null})).unwrap();
        assert!(delete.record.is_none());
        assert!(delete.enrollment_record().is_err());
    }
}
