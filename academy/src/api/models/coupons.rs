//! API request/response models for coupons.

use crate::db::models::coupons::CouponDBResponse;
use crate::types::CouponId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "discount_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the price
    #[default]
    Percentage,
    /// `discount_value` is a flat amount in the course currency
    Fixed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub discount_value: Decimal,
    pub active: bool,
    pub is_default: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CouponDBResponse> for CouponResponse {
    fn from(db: CouponDBResponse) -> Self {
        Self {
            id: db.id,
            code: db.code,
            discount_type: db.discount_type,
            discount_value: db.discount_value,
            active: db.active,
            is_default: db.is_default,
            expires_at: db.expires_at,
            max_uses: db.max_uses,
            times_used: db.times_used,
            description: db.description,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    /// When given, the response includes the discount against the course price
    #[schema(value_type = Option<String>, format = "uuid")]
    pub course_id: Option<crate::types::CourseId>,
}

/// Result of checking a coupon code. Rejections are reported in-band, not as errors.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub discount: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub final_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponCreate {
    pub code: String,
    /// Defaults to `percentage`
    pub discount_type: Option<DiscountType>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub discount_value: Decimal,
    /// Defaults to true
    pub active: Option<bool>,
    #[serde(default)]
    pub is_default: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponUpdate {
    pub active: Option<bool>,
    pub is_default: Option<bool>,
}
