//! HTTP request handlers for all API endpoints.
//!
//! Handlers are organized by resource type. Each one validates and deserializes the request,
//! applies the authentication and enrollment guards, calls the database repositories and
//! serializes the response.
//!
//! # Handler Modules
//!
//! - [`admin`]: Dashboard overview, student list, payments report and manual enrollment
//! - [`auth`]: Registration, login, logout and the guest check
//! - [`checkout`]: Payment intents and account creation after payment
//! - [`coupons`]: Public coupon checks and admin coupon management
//! - [`courses`]: Course catalogue, access decisions and resources
//! - [`enrollments`]: The caller's enrollments
//! - [`progress`]: Lesson progress and resume points
//! - [`quizzes`]: Module quizzes and graded attempts
//! - [`reviews`]: Course reviews, rating stats and featuring
//! - [`users`]: The current user
//! - [`webhooks`]: Payment processor events and the welcome email trigger
//!
//! # Authentication
//!
//! Handlers take [`crate::api::models::users::CurrentUser`] (session cookie or bearer token)
//! or [`crate::auth::current_user::AdminUser`] as an extractor argument.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching HTTP status code
//! and a user-safe message.

pub mod admin;
pub mod auth;
pub mod checkout;
pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod progress;
pub mod quizzes;
pub mod reviews;
pub mod users;
pub mod webhooks;
