//! OpenAPI documentation for the HTTP API, served by Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::{handlers, models};

/// Session cookie and bearer token schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token, as issued in the session cookie"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "CookieAuth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "academy_session",
                    "Session cookie set by login, registration and checkout",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::guest_check,
        handlers::users::get_current_user,
        handlers::courses::list_courses,
        handlers::courses::get_course,
        handlers::courses::get_course_access,
        handlers::courses::list_course_resources,
        handlers::courses::list_module_resources,
        handlers::enrollments::list_enrollments,
        handlers::enrollments::get_enrollment,
        handlers::enrollments::update_progress,
        handlers::enrollments::complete_course,
        handlers::progress::get_course_progress,
        handlers::progress::get_lesson_progress,
        handlers::progress::save_lesson_progress,
        handlers::progress::get_resume,
        handlers::progress::set_resume,
        handlers::progress::clear_active_quiz,
        handlers::quizzes::get_quiz,
        handlers::quizzes::list_attempts,
        handlers::quizzes::submit_attempt,
        handlers::quizzes::get_result,
        handlers::coupons::validate_coupon,
        handlers::coupons::get_default_coupon,
        handlers::coupons::list_coupons,
        handlers::coupons::create_coupon,
        handlers::coupons::update_coupon,
        handlers::coupons::delete_coupon,
        handlers::checkout::create_payment_intent,
        handlers::checkout::complete_checkout,
        handlers::reviews::list_reviews,
        handlers::reviews::list_featured_reviews,
        handlers::reviews::list_course_reviews,
        handlers::reviews::create_review,
        handlers::reviews::get_review_stats,
        handlers::reviews::get_my_review,
        handlers::reviews::update_review,
        handlers::reviews::delete_review,
        handlers::reviews::set_featured,
        handlers::admin::get_overview,
        handlers::admin::list_students,
        handlers::admin::get_payments,
        handlers::admin::grant_enrollment,
        handlers::webhooks::payment_webhook,
        handlers::webhooks::enrollment_webhook,
    ),
    components(schemas(
        models::users::UserResponse,
        models::users::RegisterRequest,
        models::users::LoginRequest,
        models::users::AuthResponse,
        models::users::GuestCheckResponse,
        models::users::AuthSuccessResponse,
        models::courses::ResourceType,
        models::courses::CourseResponse,
        models::courses::ModuleResponse,
        models::courses::LessonResponse,
        models::courses::CourseDetailResponse,
        models::courses::ResourceResponse,
        models::courses::AccessDecision,
        models::courses::CourseAccessResponse,
        models::enrollments::EnrollmentStatus,
        models::enrollments::EnrollmentResponse,
        models::enrollments::EnrollmentCourseSummary,
        models::enrollments::ProgressUpdate,
        models::enrollments::GrantEnrollmentRequest,
        models::progress::LessonProgressUpdate,
        models::progress::LessonProgressResponse,
        models::progress::CourseProgressResponse,
        models::progress::ResumeUpdate,
        models::progress::ResumeResponse,
        models::quizzes::QuizResponse,
        models::quizzes::QuizQuestionResponse,
        models::quizzes::QuizOptionResponse,
        models::quizzes::QuizSubmission,
        models::quizzes::SubmittedAnswer,
        models::quizzes::QuizAttemptResponse,
        models::quizzes::GradedAnswerResponse,
        models::quizzes::QuizResultResponse,
        models::coupons::DiscountType,
        models::coupons::CouponResponse,
        models::coupons::ValidateCouponRequest,
        models::coupons::ValidateCouponResponse,
        models::coupons::CouponCreate,
        models::coupons::CouponUpdate,
        models::checkout::PaymentIntentRequest,
        models::checkout::PaymentIntentResponse,
        models::checkout::CompleteCheckoutRequest,
        models::checkout::CompleteCheckoutResponse,
        models::reviews::ReviewResponse,
        models::reviews::ReviewCreate,
        models::reviews::ReviewUpdate,
        models::reviews::FeaturedUpdate,
        models::reviews::RatingDistribution,
        models::reviews::ReviewStats,
        models::reviews::HasReviewedResponse,
        models::reviews::ReviewPage,
        models::admin::AdminOverview,
        models::admin::MonthlyRevenue,
        models::admin::RecentEnrollmentResponse,
        models::admin::PaymentResponse,
        models::admin::StudentResponse,
        models::admin::TimeRange,
        models::admin::PaymentsReport,
        models::webhooks::EnrollmentWebhookPayload,
        models::webhooks::EnrollmentRecord,
        models::webhooks::WelcomeEmailResponse,
        models::webhooks::WebhookAck,
    )),
    tags(
        (name = "authentication", description = "Registration, login and session cookies"),
        (name = "users", description = "The signed-in user"),
        (name = "courses", description = "Course catalogue, access decisions and downloadable resources"),
        (name = "enrollments", description = "The caller's enrollments"),
        (name = "progress", description = "Lesson progress and where to resume"),
        (name = "quizzes", description = "Module quizzes and graded attempts"),
        (name = "coupons", description = "Coupon checks before checkout"),
        (name = "checkout", description = "Payment intents and account creation after payment"),
        (name = "reviews", description = "Course reviews and ratings"),
        (name = "admin", description = "Back-office figures and management. Requires an admin account."),
        (name = "webhooks", description = "Inbound notifications from the payment processor and the database"),
    ),
    info(
        title = "BraveFx Academy API",
        version = "1.0.0",
        description = "Backend for the BraveFx Academy course platform.

## Authentication

Login, registration and checkout set an `academy_session` cookie. The same token is also
accepted as `Authorization: Bearer <token>`.

## Errors

Most errors are returned as a plain-text message with the matching status code. Conflicts and
missing enrollments return JSON with a `message` field; a missing enrollment also carries the
`redirect` to the checkout page.",
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route_group() {
        let spec = ApiDoc::openapi();
        let paths: Vec<_> = spec.paths.paths.keys().cloned().collect();
        for expected in [
            "/authentication/register",
            "/api/v1/courses/{course_id}/access",
            "/api/v1/modules/{module_id}/quiz/attempts",
            "/api/v1/checkout/complete",
            "/api/v1/admin/coupons/{coupon_id}",
            "/webhooks/enrollments",
        ] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected}");
        }
        let components = spec.components.unwrap();
        assert!(components.security_schemes.contains_key("CookieAuth"));
    }
}
