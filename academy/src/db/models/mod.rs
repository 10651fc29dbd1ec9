//! Database record structures.
//!
//! Create/update request structs carry validated input into the repositories in
//! [`crate::db::handlers`]; response structs are what the repositories return. API-facing shapes
//! live in [`crate::api::models`].

pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod payments;
pub mod progress;
pub mod quizzes;
pub mod reviews;
pub mod users;
