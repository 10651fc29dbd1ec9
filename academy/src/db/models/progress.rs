//! Database models for lesson progress and per-course resume points.

use crate::types::{CourseId, LessonId, ModuleId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct LessonProgressUpsertDBRequest {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    /// Playback position in seconds
    pub last_position: i32,
    pub progress_percentage: i32,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct LessonProgressDBResponse {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub last_position: i32,
    pub progress_percentage: i32,
    pub completed: bool,
    pub last_updated: DateTime<Utc>,
}

/// Where a student left off in a course. At most one of the two targets is set.
#[derive(Debug, Clone, FromRow)]
pub struct CourseResumeDBResponse {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub last_lesson_id: Option<LessonId>,
    pub active_quiz_module_id: Option<ModuleId>,
    pub updated_at: DateTime<Utc>,
}
