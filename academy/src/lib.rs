//! # academy: backend for the BraveFx Academy course platform
//!
//! `academy` serves the JSON API behind the BraveFx Academy single-page frontend: a catalogue of
//! forex trading courses, paid enrollment through a card processor, lesson progress tracking,
//! graded module quizzes, course reviews and an admin back-office.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! Requests pass through CORS and tracing layers and reach a handler in [`api::handlers`]. The
//! caller is identified by the [`api::models::users::CurrentUser`] extractor, which reads the
//! session cookie or a bearer token carrying the same JWT. Handlers that touch course content
//! check enrollment through [`auth::guards`], then talk to PostgreSQL through the repositories in
//! [`db::handlers`].
//!
//! ### Checkout
//!
//! A visitor buys a course without an account. The server prices the course (applying any coupon)
//! and asks the [`payment_providers::PaymentProvider`] for a payment intent. Once the browser has
//! confirmed the card, `/api/v1/checkout/complete` re-reads the intent from the processor and, in
//! one transaction, creates the account, records the payment, grants the enrollment and redeems
//! the coupon. The processor's webhooks keep the recorded payment status current.
//!
//! ### Core Components
//!
//! - [`api`]: route handlers and JSON models
//! - [`auth`]: password hashing, sessions, enrollment guards
//! - [`db`]: repositories and database records
//! - [`payment_providers`]: Stripe and an in-process dummy processor
//! - [`email`]: welcome email rendering and delivery
//! - `content`, `coupons`, `grading`: pure business rules (completion, discounts, quiz scoring)
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use academy::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = academy::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     academy::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
mod content;
mod coupons;
pub mod db;
pub mod email;
pub mod errors;
mod grading;
mod openapi;
pub mod payment_providers;
pub mod telemetry;
mod types;

#[cfg(test)]
mod test;

use crate::{
    auth::password::{Argon2Params, hash_string_with_params},
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    email::EmailService,
    openapi::ApiDoc,
    payment_providers::PaymentProvider,
};
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{delete, get, patch, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{CouponId, CourseId, EnrollmentId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .payment_provider(provider)
///     .mailer(mailer)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Card processor used by checkout and the payment webhook
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub mailer: Arc<EmailService>,
}

/// Get the academy database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the bootstrap admin user, or promote and reset the password of an existing account.
///
/// Idempotent. Returns the admin's user id.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: &str, params: Argon2Params, db: &PgPool) -> anyhow::Result<UserId> {
    let email = email.trim().to_lowercase();
    let password_hash = hash_string_with_params(password, params)?;

    let mut tx = db.begin().await?;

    let existing = Users::new(&mut tx).get_user_by_email(&email).await?;
    if let Some(existing_user) = existing {
        sqlx::query("UPDATE users SET password_hash = $1, is_admin = TRUE WHERE id = $2")
            .bind(&password_hash)
            .bind(existing_user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE profiles SET is_admin = TRUE WHERE id = $1")
            .bind(existing_user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let created_user = Users::new(&mut tx)
        .create(&UserCreateDBRequest {
            email,
            full_name: Some("Administrator".to_string()),
            is_admin: true,
            password_hash: Some(password_hash),
        })
        .await?;

    tx.commit().await?;
    Ok(created_user.id)
}

/// Connect to the database, run migrations, and create the bootstrap admin
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(optional(settings.idle_timeout_secs))
        .max_lifetime(optional(settings.max_lifetime_secs))
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    if let Some(password) = config.admin_password.as_deref() {
        create_initial_admin_user(&config.admin_email, password, Argon2Params::from(&config.auth.password), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;
    }

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allowed = &config.auth.security.cors.allowed_origins;
    let allow_origin = if allowed.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in allowed {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut exposed = vec![http::header::LOCATION];
    for name in &config.auth.security.cors.exposed_headers {
        let header = name.parse::<http::HeaderName>()?;
        if !exposed.contains(&header) {
            exposed.push(header);
        }
    }

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(exposed);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// Authentication lives at `/authentication/*`, the JSON API under `/api/v1`, processor and
/// database callbacks under `/webhooks`, and the API reference at `/docs`. Prometheus metrics are
/// served at `/internal/metrics` when enabled.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{admin, auth, checkout, coupons, courses, enrollments, progress, quizzes, reviews, users, webhooks};

    let auth_routes = Router::new()
        .route("/authentication/register", post(auth::register))
        .route("/authentication/login", post(auth::login))
        .route("/authentication/logout", post(auth::logout))
        .route("/authentication/guest", get(auth::guest_check));

    let api_routes = Router::new()
        .route("/users/current", get(users::get_current_user))
        // Catalogue
        .route("/courses", get(courses::list_courses))
        .route("/courses/{course_id}", get(courses::get_course))
        .route("/courses/{course_id}/access", get(courses::get_course_access))
        .route("/courses/{course_id}/resources", get(courses::list_course_resources))
        .route("/modules/{module_id}/resources", get(courses::list_module_resources))
        // Enrollments and progress
        .route("/enrollments", get(enrollments::list_enrollments))
        .route("/enrollments/{course_id}", get(enrollments::get_enrollment))
        .route("/enrollments/{course_id}/progress", put(enrollments::update_progress))
        .route("/enrollments/{course_id}/complete", post(enrollments::complete_course))
        .route("/courses/{course_id}/progress", get(progress::get_course_progress))
        .route(
            "/lessons/{lesson_id}/progress",
            get(progress::get_lesson_progress).put(progress::save_lesson_progress),
        )
        .route("/courses/{course_id}/resume", get(progress::get_resume).put(progress::set_resume))
        .route("/courses/{course_id}/resume/quiz", delete(progress::clear_active_quiz))
        // Quizzes
        .route("/modules/{module_id}/quiz", get(quizzes::get_quiz))
        .route(
            "/modules/{module_id}/quiz/attempts",
            get(quizzes::list_attempts).post(quizzes::submit_attempt),
        )
        .route("/modules/{module_id}/quiz/result", get(quizzes::get_result))
        // Coupons and checkout
        .route("/coupons/validate", post(coupons::validate_coupon))
        .route("/coupons/default", get(coupons::get_default_coupon))
        .route("/checkout/payment-intent", post(checkout::create_payment_intent))
        .route("/checkout/complete", post(checkout::complete_checkout))
        // Reviews
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews/featured", get(reviews::list_featured_reviews))
        .route("/reviews/{review_id}", patch(reviews::update_review).delete(reviews::delete_review))
        .route(
            "/courses/{course_id}/reviews",
            get(reviews::list_course_reviews).post(reviews::create_review),
        )
        .route("/courses/{course_id}/reviews/stats", get(reviews::get_review_stats))
        .route("/courses/{course_id}/reviews/mine", get(reviews::get_my_review))
        // Admin back-office
        .route("/admin/overview", get(admin::get_overview))
        .route("/admin/students", get(admin::list_students))
        .route("/admin/payments", get(admin::get_payments))
        .route("/admin/enrollments", post(admin::grant_enrollment))
        .route("/admin/coupons", get(coupons::list_coupons).post(coupons::create_coupon))
        .route(
            "/admin/coupons/{coupon_id}",
            patch(coupons::update_coupon).delete(coupons::delete_coupon),
        )
        .route("/admin/reviews/{review_id}/featured", patch(reviews::set_featured));

    let webhook_routes = Router::new()
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        .route("/webhooks/enrollments", post(webhooks::enrollment_webhook));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(webhook_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The configured HTTP server and the resources it owns.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application on an existing pool.
    ///
    /// A supplied pool is used as is: migrations and the bootstrap admin are only handled when the
    /// application connects by itself.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting academy with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => setup_database(&config).await?,
        };

        let payment_provider: Arc<dyn PaymentProvider> = Arc::from(payment_providers::create_provider(config.payment.clone()));
        info!("Using payment provider: {}", payment_provider.name());

        let mailer = Arc::new(EmailService::new(&config)?);

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .payment_provider(payment_provider)
            .mailer(mailer)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Academy listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_string;
    use crate::test::utils::{create_test_app, create_test_config, create_test_user_with_password};

    fn fast_params() -> Argon2Params {
        Argon2Params::from(&create_test_config().auth.password)
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_new_user(pool: PgPool) {
        let user_id = create_initial_admin_user("Owner@BraveFx.io", "bootstrap-password", fast_params(), &pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email("owner@bravefx.io").await.unwrap().unwrap();
        assert_eq!(user.id, user_id);
        assert!(user.is_admin);
        assert!(verify_string("bootstrap-password", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_promotes_existing(pool: PgPool) {
        let existing = create_test_user_with_password(&pool, "owner@bravefx.io", "old-password-1", false).await;

        let user_id = create_initial_admin_user("owner@bravefx.io", "new-password-1", fast_params(), &pool)
            .await
            .unwrap();
        assert_eq!(user_id, existing.id);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(existing.id).await.unwrap().unwrap();
        assert!(user.is_admin);
        assert!(verify_string("new-password-1", user.password_hash.as_deref().unwrap()).unwrap());

        let profile_admin: bool = sqlx::query_scalar("SELECT is_admin FROM profiles WHERE id = $1")
            .bind(existing.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(profile_admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_health_and_docs(pool: PgPool) {
        let server = create_test_app(pool).await;

        let health = server.get("/healthz").await;
        health.assert_status_ok();
        assert_eq!(health.text(), "OK");

        server.get("/docs").await.assert_status_ok();

        // Metrics are off in the test config
        server.get("/internal/metrics").await.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_build_router_with_metrics_enabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = true;

        let app_state = AppState::builder()
            .db(pool)
            .payment_provider(Arc::from(payment_providers::create_provider(config.payment.clone())))
            .mailer(Arc::new(EmailService::new(&config).unwrap()))
            .config(config)
            .build();

        let router = build_router(&app_state).unwrap();
        let server = axum_test::TestServer::new(router).unwrap();

        server.get("/healthz").await.assert_status_ok();
        let metrics = server.get("/internal/metrics").await;
        metrics.assert_status_ok();
        assert!(metrics.text().contains("# TYPE"));
    }

    #[test]
    fn test_cors_layer_rejects_bad_header_names() {
        let mut config = create_test_config();
        config.auth.security.cors.exposed_headers = vec!["not a header".to_string()];
        assert!(create_cors_layer(&config).is_err());
    }
}
