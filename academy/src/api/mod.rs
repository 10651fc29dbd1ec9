//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): register, login, logout, guest check
//! - **Catalogue** (`/api/v1/courses/*`, `/api/v1/modules/*`): courses, resources, quizzes
//! - **Student** (`/api/v1/enrollments/*`, `/api/v1/lessons/*`): enrollments and progress
//! - **Checkout** (`/api/v1/checkout/*`, `/api/v1/coupons/*`): payment intents and account creation
//! - **Reviews** (`/api/v1/reviews/*`)
//! - **Admin** (`/api/v1/admin/*`): overview, students, payments, coupons
//! - **Webhooks** (`/webhooks/*`): payment processor events and the welcome email trigger
//!
//! API documentation is served at `/docs`.

pub mod handlers;
pub mod models;
