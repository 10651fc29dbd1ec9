//! API request/response models for lesson progress and resume points.

use crate::db::models::progress::{CourseResumeDBResponse, LessonProgressDBResponse};
use crate::types::{CourseId, LessonId, ModuleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressUpdate {
    /// Playback position in seconds
    #[serde(default)]
    pub last_position: i32,
    #[serde(default)]
    pub progress_percentage: i32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressResponse {
    #[schema(value_type = String, format = "uuid")]
    pub lesson_id: LessonId,
    pub last_position: i32,
    pub progress_percentage: i32,
    pub completed: bool,
    pub last_updated: DateTime<Utc>,
}

impl From<LessonProgressDBResponse> for LessonProgressResponse {
    fn from(db: LessonProgressDBResponse) -> Self {
        Self {
            lesson_id: db.lesson_id,
            last_position: db.last_position,
            progress_percentage: db.progress_percentage,
            completed: db.completed,
            last_updated: db.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressResponse {
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    /// Rounded percentage of completed lessons
    pub progress: i32,
    pub lessons: Vec<LessonProgressResponse>,
}

/// Either a lesson or a quiz to resume. Setting one clears the other.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub last_lesson_id: Option<LessonId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub active_quiz_module_id: Option<ModuleId>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub last_lesson_id: Option<LessonId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub active_quiz_module_id: Option<ModuleId>,
    pub updated_at: DateTime<Utc>,
}

impl From<CourseResumeDBResponse> for ResumeResponse {
    fn from(db: CourseResumeDBResponse) -> Self {
        Self {
            course_id: db.course_id,
            last_lesson_id: db.last_lesson_id,
            active_quiz_module_id: db.active_quiz_module_id,
            updated_at: db.updated_at,
        }
    }
}
