//! Coupon rules and price arithmetic.
//!
//! Both the public coupon check and the payment-intent path run the same checks here, so the
//! amount sent to the payment processor always matches what the student was quoted.

use crate::api::models::coupons::DiscountType;
use crate::db::models::coupons::CouponDBResponse;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Canonical form of a coupon code: trimmed and uppercase
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Why a coupon code cannot be applied. Variants are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("Coupon code not found")]
    NotFound,
    #[error("This coupon is no longer active")]
    Inactive,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,
}

/// Check a looked-up coupon against the activity, expiry and usage rules.
pub fn check_usable(coupon: Option<&CouponDBResponse>, now: DateTime<Utc>) -> Result<&CouponDBResponse, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::NotFound)?;

    if !coupon.active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.expires_at.is_some_and(|expires_at| expires_at < now) {
        return Err(CouponRejection::Expired);
    }
    if coupon.max_uses.is_some_and(|max_uses| coupon.times_used >= max_uses) {
        return Err(CouponRejection::UsageLimitReached);
    }

    Ok(coupon)
}

/// Discount for `price`, never more than the price itself, rounded to cents.
pub fn calculate_discount(discount_type: DiscountType, discount_value: Decimal, price: Decimal) -> Decimal {
    let raw = match discount_type {
        DiscountType::Percentage => price * discount_value / Decimal::ONE_HUNDRED,
        DiscountType::Fixed => discount_value,
    };
    raw.min(price)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a dollar amount into whole cents. `None` if it does not fit an `i64`.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// A course price after an optional coupon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub list_price: Decimal,
    pub discount: Decimal,
    pub final_price: Decimal,
}

impl PriceQuote {
    pub fn new(list_price: Decimal, coupon: Option<&CouponDBResponse>) -> Self {
        let discount = coupon
            .map(|c| calculate_discount(c.discount_type, c.discount_value, list_price))
            .unwrap_or(Decimal::ZERO);
        Self {
            list_price,
            discount,
            final_price: list_price - discount,
        }
    }

    pub fn amount_cents(&self) -> Option<i64> {
        to_cents(self.final_price)
    }
}
