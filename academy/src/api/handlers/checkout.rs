//! Guest checkout: price a course, then turn a confirmed payment into an account and enrollment.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use sqlx::Acquire;

use crate::{
    AppState,
    api::models::{
        checkout::{CompleteCheckoutRequest, CompleteCheckoutResponse, PaymentIntentRequest, PaymentIntentResponse},
        enrollments::{EnrollmentResponse, EnrollmentStatus},
        users::{CurrentUser, SessionResponse, UserResponse},
    },
    auth::{
        password::{self, Argon2Params},
        session,
        validation::{normalize_email, validate_email, validate_full_name, validate_password},
    },
    coupons::{PriceQuote, check_usable, normalize_code},
    db::{
        errors::DbError,
        handlers::{Coupons, Courses, Enrollments, Payments, Repository, Users},
        models::{
            coupons::{CouponDBResponse, CouponRedemptionCreateDBRequest},
            courses::CourseDBResponse,
            enrollments::{EnrollmentCreateDBRequest, EnrollmentDBResponse},
            payments::{PAYMENT_STATUS_COMPLETED, PaymentCreateDBRequest},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    email,
    errors::Error,
    payment_providers::{CreatePaymentIntent, PaymentError, PaymentIntent},
    types::CourseId,
};

const PAYMENT_USED_MESSAGE: &str = "This payment has already been used";

async fn load_course(conn: &mut sqlx::PgConnection, course_id: CourseId) -> Result<CourseDBResponse, Error> {
    Courses::new(conn).get_by_id(course_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Course".to_string(),
        id: course_id.to_string(),
    })
}

/// Create a payment intent for the course price after any coupon
///
/// The amount is computed here from the stored price and coupon, never taken from the client.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/payment-intent",
    tag = "checkout",
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 400, description = "Unusable coupon or amount below the minimum"),
        (status = 404, description = "Course not found"),
        (status = 502, description = "Payment provider unavailable"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let course = load_course(&mut conn, request.course_id).await?;

    let code = request.coupon_code.as_deref().map(normalize_code).filter(|c| !c.is_empty());
    let coupon = match &code {
        Some(code) => {
            let found = Coupons::new(&mut conn).get_by_code(code).await?;
            let coupon = check_usable(found.as_ref(), chrono::Utc::now()).map_err(|rejection| Error::BadRequest {
                message: rejection.to_string(),
            })?;
            Some(coupon.clone())
        }
        None => None,
    };
    drop(conn);

    let quote = PriceQuote::new(course.price, coupon.as_ref());
    let minimum = state.config.checkout.minimum_amount_cents;
    let amount = quote.amount_cents().filter(|cents| *cents >= minimum).ok_or_else(|| Error::BadRequest {
        message: format!("Invalid amount. Minimum ${} required.", Decimal::new(minimum, 2)),
    })?;

    let intent = state
        .payment_provider
        .create_payment_intent(&CreatePaymentIntent {
            amount,
            currency: state.config.checkout.currency.clone(),
            metadata: vec![
                ("source".to_string(), state.config.checkout.metadata_source.clone()),
                ("course_id".to_string(), course.id.to_string()),
                ("coupon_code".to_string(), code.clone().unwrap_or_default()),
            ],
        })
        .await?;

    let client_secret = intent
        .client_secret
        .ok_or_else(|| PaymentError::ProviderApi(format!("payment intent {} has no client secret", intent.id)))?;

    tracing::info!("Created payment intent {} for {} cents", intent.id, amount);
    Ok(Json(PaymentIntentResponse {
        client_secret,
        verified_amount: amount,
        coupon_applied: code.filter(|_| coupon.is_some()),
    }))
}

/// What a fulfilled checkout wrote
struct Fulfilment {
    user: UserDBResponse,
    enrollment: EnrollmentDBResponse,
    amount_saved: Decimal,
}

/// Write the account, payment, enrollment and coupon redemption in one transaction
async fn fulfil(
    state: &AppState,
    intent: &PaymentIntent,
    course_id: CourseId,
    email: String,
    full_name: String,
    password_hash: String,
    coupon_code: Option<String>,
) -> Result<Fulfilment, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut tx = conn.begin().await.map_err(DbError::from)?;

    let course = load_course(&mut tx, course_id).await?;
    let coupon: Option<CouponDBResponse> = match coupon_code {
        Some(code) => {
            let found = Coupons::new(&mut tx).get_by_code(&code).await?;
            match check_usable(found.as_ref(), chrono::Utc::now()) {
                Ok(coupon) => Some(coupon.clone()),
                Err(rejection) => {
                    // The intent was priced while the coupon was usable; the charge stands but no redemption is recorded
                    tracing::warn!("Coupon {} on payment intent {} no longer usable: {}", code, intent.id, rejection);
                    None
                }
            }
        }
        None => None,
    };
    let amount_saved = PriceQuote::new(course.price, coupon.as_ref()).discount;

    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest {
            email,
            full_name: Some(full_name),
            is_admin: false,
            password_hash: Some(password_hash),
        })
        .await?;

    let payment = Payments::new(&mut tx)
        .create(&PaymentCreateDBRequest {
            user_id: user.id,
            course_id: Some(course.id),
            amount: intent.amount,
            currency: intent.currency.clone(),
            payment_intent_id: intent.id.clone(),
            status: PAYMENT_STATUS_COMPLETED.to_string(),
            payment_method: state.payment_provider.name().to_string(),
            coupon_id: coupon.as_ref().map(|c| c.id),
        })
        .await?;

    let enrollment = Enrollments::new(&mut tx)
        .create(&EnrollmentCreateDBRequest {
            user_id: user.id,
            course_id: course.id,
            status: EnrollmentStatus::Active,
            expires_at: None,
            payment_id: Some(payment.id),
            purchased_by: None,
        })
        .await?;

    if let Some(coupon) = &coupon {
        Coupons::new(&mut tx)
            .record_redemption(&CouponRedemptionCreateDBRequest {
                coupon_id: coupon.id,
                user_id: user.id,
                enrollment_id: Some(enrollment.id),
                amount_saved,
            })
            .await?;
    }

    tx.commit().await.map_err(DbError::from)?;

    Ok(Fulfilment {
        user,
        enrollment,
        amount_saved,
    })
}

/// Create the student's account and enrollment once the payment has succeeded
#[utoipa::path(
    post,
    path = "/api/v1/checkout/complete",
    tag = "checkout",
    request_body = CompleteCheckoutRequest,
    responses(
        (status = 201, description = "Account created and enrolled; session cookie set", body = CompleteCheckoutResponse),
        (status = 400, description = "Invalid input or payment for another course"),
        (status = 402, description = "Payment not completed"),
        (status = 409, description = "Payment already used"),
        (status = 500, description = "Payment succeeded but fulfilment failed"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn complete_checkout(
    State(state): State<AppState>,
    Json(request): Json<CompleteCheckoutRequest>,
) -> Result<SessionResponse<CompleteCheckoutResponse>, Error> {
    let email = normalize_email(&request.email);
    validate_email(&email)?;
    validate_password(&request.password, &state.config.auth.password)?;
    let full_name = validate_full_name(&request.full_name)?;
    if !request.agreed_to_terms {
        return Err(Error::BadRequest {
            message: "You must agree to the terms".to_string(),
        });
    }
    let payment_intent_id = request.payment_intent_id.trim();
    if payment_intent_id.is_empty() {
        return Err(Error::BadRequest {
            message: "Payment intent is required".to_string(),
        });
    }

    let intent = state.payment_provider.retrieve_payment_intent(payment_intent_id).await?;
    if !intent.is_succeeded() {
        return Err(PaymentError::PaymentNotCompleted.into());
    }
    if intent.metadata_value("course_id") != Some(request.course_id.to_string().as_str()) {
        return Err(Error::BadRequest {
            message: "Payment does not match this course".to_string(),
        });
    }

    // The coupon that priced the intent is authoritative
    let coupon_code = intent.metadata_value("coupon_code").map(normalize_code).filter(|c| !c.is_empty());
    let requested_code = request.coupon_code.as_deref().map(normalize_code).filter(|c| !c.is_empty());
    if requested_code.is_some() && requested_code != coupon_code {
        return Err(Error::BadRequest {
            message: "Coupon does not match this payment".to_string(),
        });
    }

    {
        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        if Payments::new(&mut conn).get_by_intent(&intent.id).await?.is_some() {
            return Err(Error::Conflict {
                message: PAYMENT_USED_MESSAGE.to_string(),
            });
        }
    }

    // From here on the customer has been charged
    let incomplete = |reason: String| Error::CheckoutIncomplete {
        payment_intent_id: intent.id.clone(),
        reason,
    };

    let password_hash = password::hash_password(request.password, Argon2Params::from(&state.config.auth.password))
        .await
        .map_err(|e| incomplete(e.to_string()))?;
    let fulfilment = fulfil(&state, &intent, request.course_id, email, full_name, password_hash, coupon_code)
        .await
        .map_err(|e| match e {
            Error::Database(db) if db.is_unique_violation_on("payments_payment_intent_id_unique") => Error::Conflict {
                message: PAYMENT_USED_MESSAGE.to_string(),
            },
            other => incomplete(other.to_string()),
        })?;

    tracing::info!(
        "Checkout completed for user {} on course {} with payment intent {}",
        fulfilment.user.id,
        request.course_id,
        intent.id
    );

    if state.config.checkout.send_welcome_email {
        let db = state.db.clone();
        let mailer = state.mailer.clone();
        let (user_id, course_id) = (fulfilment.user.id, request.course_id);
        tokio::spawn(async move {
            if let Err(e) = email::send_enrollment_welcome(&db, &mailer, user_id, course_id).await {
                tracing::warn!("Failed to send welcome email to user {}: {}", user_id, e);
            }
        });
    }

    let current_user = CurrentUser::from(fulfilment.user.clone());
    let token = session::create_session_token(&current_user, &state.config).map_err(|e| incomplete(e.to_string()))?;

    Ok(SessionResponse {
        status: StatusCode::CREATED,
        body: CompleteCheckoutResponse {
            user: UserResponse::from(fulfilment.user),
            enrollment: EnrollmentResponse::from(fulfilment.enrollment),
            amount_paid: intent.amount,
            amount_saved: fulfilment.amount_saved,
        },
        cookie: session::create_session_cookie(&token, &state.config),
    })
}
