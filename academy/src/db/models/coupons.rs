//! Database models for coupons and their redemptions.

use crate::api::models::coupons::DiscountType;
use crate::types::{CouponId, EnrollmentId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CouponCreateDBRequest {
    /// Already normalised (trimmed, uppercase)
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub active: bool,
    pub is_default: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CouponUpdateDBRequest {
    pub active: Option<bool>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CouponDBResponse {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub active: bool,
    pub is_default: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CouponRedemptionCreateDBRequest {
    pub coupon_id: CouponId,
    pub user_id: UserId,
    pub enrollment_id: Option<EnrollmentId>,
    pub amount_saved: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct CouponRedemptionDBResponse {
    pub id: uuid::Uuid,
    pub coupon_id: CouponId,
    pub user_id: UserId,
    pub enrollment_id: Option<EnrollmentId>,
    pub amount_saved: Decimal,
    pub redeemed_at: DateTime<Utc>,
}
