//! Database repository for coupons and coupon redemptions.

use crate::coupons::check_usable;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::coupons::{
        CouponCreateDBRequest, CouponDBResponse, CouponRedemptionCreateDBRequest, CouponRedemptionDBResponse, CouponUpdateDBRequest,
    },
};
use crate::types::{CouponId, UserId, abbrev_uuid};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing coupons
#[derive(Debug, Clone)]
pub struct CouponFilter {
    pub skip: i64,
    pub limit: i64,
}

impl CouponFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

pub struct Coupons<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Coupons<'c> {
    type CreateRequest = CouponCreateDBRequest;
    type UpdateRequest = CouponUpdateDBRequest;
    type Response = CouponDBResponse;
    type Id = CouponId;
    type Filter = CouponFilter;

    #[instrument(skip(self, request), fields(code = %request.code), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let coupon = sqlx::query_as::<_, CouponDBResponse>(
            r#"
            INSERT INTO coupons (code, discount_type, discount_value, active, is_default, expires_at, max_uses, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&request.code)
        .bind(request.discount_type)
        .bind(request.discount_value)
        .bind(request.active)
        .bind(request.is_default)
        .bind(request.expires_at)
        .bind(request.max_uses)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(coupon)
    }

    #[instrument(skip(self), fields(coupon_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let coupon = sqlx::query_as::<_, CouponDBResponse>("SELECT * FROM coupons WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(coupon)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<CouponId>) -> Result<HashMap<Self::Id, CouponDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let coupons = sqlx::query_as::<_, CouponDBResponse>("SELECT * FROM coupons WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(coupons.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Newest first
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let coupons = sqlx::query_as::<_, CouponDBResponse>("SELECT * FROM coupons ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(coupons)
    }

    #[instrument(skip(self), fields(coupon_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(coupon_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        sqlx::query_as::<_, CouponDBResponse>(
            r#"
            UPDATE coupons SET
                active = COALESCE($2, active),
                is_default = COALESCE($3, is_default)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.active)
        .bind(request.is_default)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)
    }
}

impl<'c> Coupons<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a coupon by an already normalised code
    #[instrument(skip(self), err)]
    pub async fn get_by_code(&mut self, code: &str) -> Result<Option<CouponDBResponse>> {
        let coupon = sqlx::query_as::<_, CouponDBResponse>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(coupon)
    }

    /// The coupon pre-filled at checkout, if one is flagged default and still usable
    #[instrument(skip(self), err)]
    pub async fn get_default(&mut self) -> Result<Option<CouponDBResponse>> {
        let coupon = sqlx::query_as::<_, CouponDBResponse>(
            "SELECT * FROM coupons WHERE is_default AND active ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(coupon.filter(|c| check_usable(Some(c), chrono::Utc::now()).is_ok()))
    }

    /// Record a redemption, then bump the coupon's usage counter.
    ///
    /// The counter update runs in a savepoint; if it fails the redemption still stands and the
    /// failure is only logged.
    #[instrument(skip(self, request), fields(coupon_id = %abbrev_uuid(&request.coupon_id), user_id = %abbrev_uuid(&request.user_id)), err)]
    pub async fn record_redemption(&mut self, request: &CouponRedemptionCreateDBRequest) -> Result<CouponRedemptionDBResponse> {
        let redemption = sqlx::query_as::<_, CouponRedemptionDBResponse>(
            r#"
            INSERT INTO coupon_redemptions (coupon_id, user_id, enrollment_id, amount_saved)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.coupon_id)
        .bind(request.user_id)
        .bind(request.enrollment_id)
        .bind(request.amount_saved)
        .fetch_one(&mut *self.db)
        .await?;

        if let Err(e) = self.increment_usage(request.coupon_id).await {
            tracing::warn!("Failed to increment usage for coupon {}: {}", request.coupon_id, e);
        }

        Ok(redemption)
    }

    async fn increment_usage(&mut self, coupon_id: CouponId) -> Result<()> {
        let mut savepoint = self.db.begin().await?;
        sqlx::query("UPDATE coupons SET times_used = times_used + 1 WHERE id = $1")
            .bind(coupon_id)
            .execute(&mut *savepoint)
            .await?;
        savepoint.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(coupon_id = %abbrev_uuid(&coupon_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn has_user_used(&mut self, coupon_id: CouponId, user_id: UserId) -> Result<bool> {
        let used = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM coupon_redemptions WHERE coupon_id = $1 AND user_id = $2)",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(used)
    }
}
