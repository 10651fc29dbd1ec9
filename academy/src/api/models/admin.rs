//! API request/response models for the admin back-office.

use crate::api::models::enrollments::EnrollmentStatus;
use crate::db::handlers::users::StudentRow;
use crate::db::models::enrollments::RecentEnrollment;
use crate::db::models::payments::{PaymentDBResponse, PaymentWithCustomer};
use crate::types::{CouponId, CourseId, EnrollmentId, PaymentId, UserId};
use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Revenue for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    /// e.g. "Jan 2025"
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentEnrollmentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EnrollmentId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub course_title: Option<String>,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

impl From<RecentEnrollment> for RecentEnrollmentResponse {
    fn from(row: RecentEnrollment) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            full_name: row.full_name,
            course_id: row.course_id,
            course_title: row.course_title,
            status: row.status,
            enrolled_at: row.enrolled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub course_id: Option<CourseId>,
    /// Amount in cents
    pub amount: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub status: String,
    pub payment_method: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub coupon_id: Option<CouponId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            course_id: db.course_id,
            amount: db.amount,
            currency: db.currency,
            payment_intent_id: db.payment_intent_id,
            status: db.status,
            payment_method: db.payment_method,
            coupon_id: db.coupon_id,
            created_at: db.created_at,
            email: None,
            full_name: None,
            course_title: None,
        }
    }
}

impl From<PaymentWithCustomer> for PaymentResponse {
    fn from(row: PaymentWithCustomer) -> Self {
        Self {
            email: row.email,
            full_name: row.full_name,
            course_title: row.course_title,
            ..PaymentResponse::from(row.payment)
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    /// Sum of all payments, in dollars
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_revenue: Decimal,
    pub total_students: i64,
    pub active_students: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub average_rating: Decimal,
    pub total_payments: i64,
    pub successful_payments: i64,
    /// Oldest month first
    pub revenue_by_month: Vec<MonthlyRevenue>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub this_month_revenue: Decimal,
    pub recent_enrollments: Vec<RecentEnrollmentResponse>,
    pub recent_payments: Vec<PaymentResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub enrollment_count: i64,
    pub latest_enrollment_status: Option<EnrollmentStatus>,
}

impl From<StudentRow> for StudentResponse {
    fn from(row: StudentRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            is_admin: row.is_admin,
            created_at: row.created_at,
            enrollment_count: row.enrollment_count,
            latest_enrollment_status: row.latest_enrollment_status,
        }
    }
}

/// Window for the admin payments listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "12m")]
    TwelveMonths,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Earliest `created_at` included in the range, or none for all time. Months are calendar months.
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::SevenDays => Some(now - Duration::days(7)),
            TimeRange::OneMonth => now.checked_sub_months(Months::new(1)),
            TimeRange::TwelveMonths => now.checked_sub_months(Months::new(12)),
            TimeRange::All => None,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PaymentsQuery {
    /// One of 7d, 1m, 12m, all (default: all)
    #[serde(default)]
    pub range: TimeRange,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsReport {
    pub payments: Vec<PaymentResponse>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_revenue: Decimal,
    pub total_transactions: i64,
    pub unique_customers: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub average_transaction: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_parses_short_names() {
        let q: PaymentsQuery = serde_json::from_str(r#"{"range":"7d"}"#).unwrap();
        assert_eq!(q.range, TimeRange::SevenDays);
        let q: PaymentsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.range, TimeRange::All);
    }

    #[test]
    fn test_time_range_since() {
        let now = Utc::now();
        assert_eq!(TimeRange::SevenDays.since(now), Some(now - Duration::days(7)));
        assert_eq!(TimeRange::All.since(now), None);

        let mid_march = DateTime::parse_from_rfc3339("2025-03-15T12:00:00Z").unwrap().with_timezone(&Utc);
        let expected = DateTime::parse_from_rfc3339("2025-02-15T12:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(TimeRange::OneMonth.since(mid_march), Some(expected));
    }
}
