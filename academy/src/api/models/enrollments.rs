//! API request/response models for enrollments.

use crate::db::models::enrollments::{EnrollmentDBResponse, EnrollmentWithCourse};
use crate::types::{CourseId, EnrollmentId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a student's enrollment in a course
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "enrollment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Trial,
    Expired,
    Refunded,
    Suspended,
    Completed,
}

impl EnrollmentStatus {
    /// Statuses that let a student into the course
    pub const ACCESSIBLE: [EnrollmentStatus; 3] = [EnrollmentStatus::Active, EnrollmentStatus::Trial, EnrollmentStatus::Completed];

    pub fn grants_access(self) -> bool {
        Self::ACCESSIBLE.contains(&self)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EnrollmentId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub expires_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub payment_id: Option<PaymentId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: i32,
    pub certificate_issued: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<EnrollmentCourseSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCourseSummary {
    pub title: String,
    pub thumbnail: Option<String>,
}

impl From<EnrollmentDBResponse> for EnrollmentResponse {
    fn from(db: EnrollmentDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            course_id: db.course_id,
            enrolled_at: db.enrolled_at,
            status: db.status,
            expires_at: db.expires_at,
            payment_id: db.payment_id,
            completed_at: db.completed_at,
            progress: db.progress,
            certificate_issued: db.certificate_issued,
            last_accessed_at: db.last_accessed_at,
            course: None,
        }
    }
}

impl From<EnrollmentWithCourse> for EnrollmentResponse {
    fn from(row: EnrollmentWithCourse) -> Self {
        let mut response = EnrollmentResponse::from(row.enrollment);
        response.course = Some(EnrollmentCourseSummary {
            title: row.course_title,
            thumbnail: row.course_thumbnail,
        });
        response
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProgressUpdate {
    /// Percentage, clamped to 0..=100
    pub progress: i32,
}

/// Admin request to enroll a student without payment
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantEnrollmentRequest {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    /// Defaults to `active`
    pub status: Option<EnrollmentStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}
