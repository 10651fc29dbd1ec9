//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (a pooled connection or an open transaction) and
//! exposes typed queries for one area of the schema, returning models from [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts and their profiles
//! - [`Courses`]: courses, modules and lessons
//! - [`Resources`]: downloadable module resources
//! - [`Enrollments`]: course access records
//! - [`Payments`]: recorded charges
//! - [`Coupons`]: discount codes and redemptions
//! - [`Progress`]: lesson progress and resume points
//! - [`Quizzes`]: module quizzes and attempts
//! - [`Reviews`]: course reviews
//! - [`analytics`]: admin dashboard aggregates (free functions over the pool)
//!
//! # Common Pattern
//!
//! ```ignore
//! use academy::db::handlers::{Users, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Users::new(&mut tx);
//!     let user = repo.get_user_by_email("student@example.com").await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! Repositories whose tables support plain CRUD ([`Users`], [`Coupons`]) implement the
//! [`Repository`] trait; the rest expose only the operations their callers need.

pub mod analytics;
pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod payments;
pub mod progress;
pub mod quizzes;
pub mod repository;
pub mod resources;
pub mod reviews;
pub mod users;

pub use coupons::Coupons;
pub use courses::Courses;
pub use enrollments::Enrollments;
pub use payments::Payments;
pub use progress::Progress;
pub use quizzes::Quizzes;
pub use repository::Repository;
pub use resources::Resources;
pub use reviews::Reviews;
pub use users::Users;
