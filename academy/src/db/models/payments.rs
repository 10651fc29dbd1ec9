//! Database models for recorded payments.

use crate::types::{CouponId, CourseId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Status written when checkout completes after the client confirmed the intent
pub const PAYMENT_STATUS_COMPLETED: &str = "completed";
/// Status written when the processor confirms the charge via webhook
pub const PAYMENT_STATUS_SUCCEEDED: &str = "succeeded";
pub const PAYMENT_STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub user_id: UserId,
    pub course_id: Option<CourseId>,
    /// Amount in cents
    pub amount: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub status: String,
    pub payment_method: String,
    pub coupon_id: Option<CouponId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub user_id: UserId,
    pub course_id: Option<CourseId>,
    pub amount: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub status: String,
    pub payment_method: String,
    pub coupon_id: Option<CouponId>,
    pub created_at: DateTime<Utc>,
}

/// Payment joined with the payer's profile and the course title
#[derive(Debug, Clone, FromRow)]
pub struct PaymentWithCustomer {
    #[sqlx(flatten)]
    pub payment: PaymentDBResponse,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub course_title: Option<String>,
}
