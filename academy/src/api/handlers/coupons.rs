use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::models::{
        coupons::{CouponCreate, CouponResponse, CouponUpdate, DiscountType, ValidateCouponRequest, ValidateCouponResponse},
        pagination::Pagination,
    },
    auth::current_user::AdminUser,
    coupons::{PriceQuote, check_usable, normalize_code},
    db::{
        errors::DbError,
        handlers::{Coupons, Courses, Repository, coupons::CouponFilter},
        models::coupons::{CouponCreateDBRequest, CouponUpdateDBRequest},
    },
    errors::Error,
    types::CouponId,
};

/// Check a coupon code, and price it against a course when one is given
///
/// Unusable codes are reported in the body with `valid: false`, not as an error status.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    tag = "coupons",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Validation result", body = ValidateCouponResponse),
        (status = 404, description = "Course not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let code = normalize_code(&request.code);
    let found = if code.is_empty() {
        None
    } else {
        Coupons::new(&mut conn).get_by_code(&code).await?
    };

    let coupon = match check_usable(found.as_ref(), Utc::now()) {
        Ok(coupon) => coupon,
        Err(rejection) => {
            tracing::debug!("Coupon {} rejected: {}", code, rejection);
            return Ok(Json(ValidateCouponResponse {
                valid: false,
                coupon: None,
                error: Some(rejection.to_string()),
                discount: None,
                final_price: None,
            }));
        }
    };

    let quote = match request.course_id {
        Some(course_id) => {
            let course = Courses::new(&mut conn).get_by_id(course_id).await?.ok_or_else(|| Error::NotFound {
                resource: "Course".to_string(),
                id: course_id.to_string(),
            })?;
            Some(PriceQuote::new(course.price, Some(coupon)))
        }
        None => None,
    };

    Ok(Json(ValidateCouponResponse {
        valid: true,
        coupon: Some(CouponResponse::from(coupon.clone())),
        error: None,
        discount: quote.as_ref().map(|q| q.discount),
        final_price: quote.map(|q| q.final_price),
    }))
}

/// The coupon pre-filled at checkout; `null` when none is set or it is no longer usable
#[utoipa::path(
    get,
    path = "/api/v1/coupons/default",
    tag = "coupons",
    responses((status = 200, description = "Default coupon", body = Option<CouponResponse>))
)]
#[tracing::instrument(skip_all)]
pub async fn get_default_coupon(State(state): State<AppState>) -> Result<Json<Option<CouponResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let coupon = Coupons::new(&mut conn).get_default().await?;
    Ok(Json(coupon.map(CouponResponse::from)))
}

/// List coupons, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons",
    tag = "admin",
    params(Pagination),
    responses(
        (status = 200, description = "Coupons", body = [CouponResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_coupons(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<CouponResponse>>, Error> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let coupons = Coupons::new(&mut conn).list(&CouponFilter::new(skip, limit)).await?;
    Ok(Json(coupons.into_iter().map(CouponResponse::from).collect()))
}

/// Create a coupon. The code is stored uppercase.
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    tag = "admin",
    request_body = CouponCreate,
    responses(
        (status = 201, description = "Created coupon", body = CouponResponse),
        (status = 400, description = "Invalid code or discount"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Code already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CouponCreate>,
) -> Result<(StatusCode, Json<CouponResponse>), Error> {
    let code = normalize_code(&request.code);
    if code.is_empty() {
        return Err(Error::BadRequest {
            message: "Coupon code is required".to_string(),
        });
    }

    let discount_type = request.discount_type.unwrap_or_default();
    if request.discount_value <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Discount value must be greater than zero".to_string(),
        });
    }
    if discount_type == DiscountType::Percentage && request.discount_value > Decimal::ONE_HUNDRED {
        return Err(Error::BadRequest {
            message: "Percentage discount cannot exceed 100".to_string(),
        });
    }
    if request.max_uses.is_some_and(|max_uses| max_uses < 1) {
        return Err(Error::BadRequest {
            message: "Maximum uses must be at least 1".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let coupon = Coupons::new(&mut conn)
        .create(&CouponCreateDBRequest {
            code,
            discount_type,
            discount_value: request.discount_value,
            active: request.active.unwrap_or(true),
            is_default: request.is_default,
            expires_at: request.expires_at,
            max_uses: request.max_uses,
            description: request.description,
        })
        .await?;

    tracing::info!("Admin {} created coupon {}", admin.id, coupon.code);
    Ok((StatusCode::CREATED, Json(CouponResponse::from(coupon))))
}

/// Toggle a coupon's active or default flag
#[utoipa::path(
    patch,
    path = "/api/v1/admin/coupons/{coupon_id}",
    tag = "admin",
    request_body = CouponUpdate,
    params(("coupon_id" = uuid::Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Updated coupon", body = CouponResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Coupon not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<CouponId>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<CouponUpdate>,
) -> Result<Json<CouponResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let coupon = Coupons::new(&mut conn)
        .update(
            coupon_id,
            &CouponUpdateDBRequest {
                active: request.active,
                is_default: request.is_default,
            },
        )
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::NotFound {
                resource: "Coupon".to_string(),
                id: coupon_id.to_string(),
            },
            other => Error::Database(other),
        })?;
    Ok(Json(CouponResponse::from(coupon)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/coupons/{coupon_id}",
    tag = "admin",
    params(("coupon_id" = uuid::Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 204, description = "Coupon deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Coupon not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<CouponId>,
    AdminUser(_admin): AdminUser,
) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    if !Coupons::new(&mut conn).delete(coupon_id).await? {
        return Err(Error::NotFound {
            resource: "Coupon".to_string(),
            id: coupon_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test::utils::{bearer_for, create_test_app, create_test_course, create_test_user};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_coupon_lifecycle(pool: PgPool) {
        let admin = create_test_user(&pool, true).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let server = create_test_app(pool).await;
        let auth = bearer_for(&admin);

        let response = server
            .post("/api/v1/admin/coupons")
            .add_header("authorization", auth.clone())
            .json(&json!({"code": "  launch50 ", "discountValue": 50}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let coupon: Value = response.json();
        assert_eq!(coupon["code"], "LAUNCH50");
        assert_eq!(coupon["discountType"], "percentage");
        assert_eq!(coupon["active"], true);

        let check: Value = server
            .post("/api/v1/coupons/validate")
            .json(&json!({"code": "launch50", "courseId": course.id}))
            .await
            .json();
        assert_eq!(check["valid"], true);
        assert_eq!(check["discount"], 148.5);
        assert_eq!(check["finalPrice"], 148.5);

        let coupon_path = format!("/api/v1/admin/coupons/{}", coupon["id"].as_str().unwrap());
        let updated: Value = server
            .patch(&coupon_path)
            .add_header("authorization", auth.clone())
            .json(&json!({"active": false}))
            .await
            .json();
        assert_eq!(updated["active"], false);

        let check: Value = server.post("/api/v1/coupons/validate").json(&json!({"code": "LAUNCH50"})).await.json();
        assert_eq!(check["valid"], false);
        assert_eq!(check["error"], "This coupon is no longer active");

        let listed: Value = server.get("/api/v1/admin/coupons").add_header("authorization", auth.clone()).await.json();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        server
            .delete(&coupon_path)
            .add_header("authorization", auth.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&coupon_path)
            .add_header("authorization", auth)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_code_rejected_in_band(pool: PgPool) {
        let server = create_test_app(pool).await;
        let response = server.post("/api/v1/coupons/validate").json(&json!({"code": "NOPE"})).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["valid"], false);
        assert_eq!(body["error"], "Coupon code not found");
        assert!(body.get("coupon").is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_default_coupon(pool: PgPool) {
        let admin = create_test_user(&pool, true).await;
        let server = create_test_app(pool).await;

        let none: Value = server.get("/api/v1/coupons/default").await.json();
        assert!(none.is_null());

        server
            .post("/api/v1/admin/coupons")
            .add_header("authorization", bearer_for(&admin))
            .json(&json!({"code": "WELCOME", "discountType": "fixed", "discountValue": 20, "isDefault": true}))
            .await
            .assert_status(StatusCode::CREATED);

        let default: Value = server.get("/api/v1/coupons/default").await.json();
        assert_eq!(default["code"], "WELCOME");
        assert_eq!(default["discountType"], "fixed");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_coupon_admin_rules(pool: PgPool) {
        let admin = create_test_user(&pool, true).await;
        let student = create_test_user(&pool, false).await;
        let server = create_test_app(pool).await;

        server
            .post("/api/v1/admin/coupons")
            .add_header("authorization", bearer_for(&student))
            .json(&json!({"code": "HACK", "discountValue": 100}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post("/api/v1/admin/coupons")
            .add_header("authorization", bearer_for(&admin))
            .json(&json!({"code": "TOOMUCH", "discountValue": 150}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Percentage discount cannot exceed 100");

        server
            .post("/api/v1/admin/coupons")
            .add_header("authorization", bearer_for(&admin))
            .json(&json!({"code": "TWICE", "discountValue": 10}))
            .await
            .assert_status(StatusCode::CREATED);
        let response = server
            .post("/api/v1/admin/coupons")
            .add_header("authorization", bearer_for(&admin))
            .json(&json!({"code": "twice", "discountValue": 10}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["message"], "A coupon with this code already exists");
    }
}
