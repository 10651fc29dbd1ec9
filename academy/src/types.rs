//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases so signatures say which table an ID belongs to.
//!
//! - [`UserId`]: user account (also the profile key)
//! - [`CourseId`], [`ModuleId`], [`LessonId`], [`ResourceId`]: the content tree
//! - [`EnrollmentId`], [`PaymentId`], [`CouponId`]: purchase records
//! - [`QuizId`], [`QuestionId`], [`OptionId`]: quizzes
//! - [`ReviewId`]: course reviews

use uuid::Uuid;

pub type UserId = Uuid;
pub type CourseId = Uuid;
pub type ModuleId = Uuid;
pub type LessonId = Uuid;
pub type ResourceId = Uuid;
pub type EnrollmentId = Uuid;
pub type PaymentId = Uuid;
pub type CouponId = Uuid;
pub type QuizId = Uuid;
pub type QuestionId = Uuid;
pub type OptionId = Uuid;
pub type ReviewId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
