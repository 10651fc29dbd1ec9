//! Database models for enrollments.

use crate::api::models::enrollments::EnrollmentStatus;
use crate::types::{CourseId, EnrollmentId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct EnrollmentCreateDBRequest {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub payment_id: Option<PaymentId>,
    /// Who paid, when different from the student (admin grants)
    pub purchased_by: Option<UserId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentDBResponse {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub payment_id: Option<PaymentId>,
    pub purchased_by: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: i32,
    pub certificate_issued: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl EnrollmentDBResponse {
    /// Whether this enrollment lets the student into the course at `now`.
    ///
    /// Only active, trial and completed enrollments count, and only until `expires_at`.
    pub fn grants_access(&self, now: DateTime<Utc>) -> bool {
        self.status.grants_access() && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Enrollment joined with the course it belongs to
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentWithCourse {
    #[sqlx(flatten)]
    pub enrollment: EnrollmentDBResponse,
    pub course_title: String,
    pub course_thumbnail: Option<String>,
}

/// Enrollment joined with the student's email and the course title, for the admin overview
#[derive(Debug, Clone, FromRow)]
pub struct RecentEnrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub course_id: CourseId,
    pub course_title: Option<String>,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}
