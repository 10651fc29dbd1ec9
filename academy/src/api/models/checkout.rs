//! API request/response models for the checkout flow.

use crate::types::CourseId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enrollments::EnrollmentResponse;
use super::users::UserResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    /// Passed to the processor's client-side confirm call
    pub client_secret: String,
    /// Amount charged in cents, after any coupon
    pub verified_amount: i64,
    /// Normalised coupon code, when one was applied
    pub coupon_applied: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCheckoutRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub agreed_to_terms: bool,
    pub payment_intent_id: String,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCheckoutResponse {
    pub user: UserResponse,
    pub enrollment: EnrollmentResponse,
    /// Amount charged in cents
    pub amount_paid: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount_saved: Decimal,
}
