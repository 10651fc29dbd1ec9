//! API request and response data models.
//!
//! These structures define the public JSON contract; field names are camelCase on the wire.
//! They are kept apart from the database records in [`crate::db::models`] so storage and API can
//! evolve independently, and are annotated with `utoipa` for the OpenAPI document.
//!
//! Postgres enum types (`enrollment_status`, `discount_type`, `resource_type`) are defined here
//! and shared with the database layer through `sqlx::Type`.

pub mod admin;
pub mod checkout;
pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod pagination;
pub mod progress;
pub mod quizzes;
pub mod reviews;
pub mod users;
pub mod webhooks;
