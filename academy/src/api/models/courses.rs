//! API request/response models for courses, modules, lessons and resources.

use crate::content::{format_duration, normalize_video_url};
use crate::db::models::courses::{CourseDBResponse, LessonDBResponse, ModuleDBResponse, ResourceDBResponse};
use crate::types::{CourseId, LessonId, ModuleId, ResourceId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of downloadable attached to a module
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "resource_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pdf,
    Excel,
    Word,
    Image,
    Video,
    Other,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub instructor: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub currency: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub total_lessons: i32,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub rating: Option<Decimal>,
    pub students_enrolled: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CourseDBResponse> for CourseResponse {
    fn from(db: CourseDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            instructor: db.instructor,
            price: db.price,
            currency: db.currency,
            thumbnail: db.thumbnail,
            duration: db.duration,
            total_lessons: db.total_lessons,
            rating: db.rating,
            students_enrolled: db.students_enrolled,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: LessonId,
    #[schema(value_type = String, format = "uuid")]
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    /// Playable URL, or "Text Lesson" for lessons without video
    pub video_url: Option<String>,
    /// Length in seconds
    pub duration: i32,
    /// Human readable length, e.g. "12:05"
    pub duration_label: String,
    pub order_index: i32,
    pub is_free: bool,
}

impl From<LessonDBResponse> for LessonResponse {
    fn from(db: LessonDBResponse) -> Self {
        Self {
            id: db.id,
            module_id: db.module_id,
            title: db.title,
            description: db.description,
            video_url: db.video_url.as_deref().map(normalize_video_url),
            duration: db.duration,
            duration_label: format_duration(db.duration.into()),
            order_index: db.order_index,
            is_free: db.is_free,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub has_quiz: bool,
    /// Sum of the lesson durations, formatted
    pub duration: String,
    pub lessons: Vec<LessonResponse>,
}

impl From<(ModuleDBResponse, Vec<LessonDBResponse>)> for ModuleResponse {
    fn from((module, lessons): (ModuleDBResponse, Vec<LessonDBResponse>)) -> Self {
        let total_seconds: i64 = lessons.iter().map(|l| i64::from(l.duration)).sum();
        Self {
            id: module.id,
            title: module.title,
            description: module.description,
            order_index: module.order_index,
            has_quiz: module.has_quiz,
            duration: format_duration(total_seconds),
            lessons: lessons.into_iter().map(LessonResponse::from).collect(),
        }
    }
}

/// A course with its full module and lesson tree
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub modules: Vec<ModuleResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ResourceId,
    #[schema(value_type = String, format = "uuid")]
    pub module_id: ModuleId,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub created_at: DateTime<Utc>,
}

impl From<ResourceDBResponse> for ResourceResponse {
    fn from(db: ResourceDBResponse) -> Self {
        Self {
            id: db.id,
            module_id: db.module_id,
            title: db.title,
            url: db.url,
            resource_type: db.resource_type,
            created_at: db.created_at,
        }
    }
}

/// Outcome of the enrollment guard for a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessDecision {
    Granted,
    Login,
    Checkout,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseAccessResponse {
    pub decision: AccessDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl CourseAccessResponse {
    pub fn granted() -> Self {
        Self {
            decision: AccessDecision::Granted,
            redirect: None,
        }
    }

    pub fn login(course_id: CourseId) -> Self {
        Self {
            decision: AccessDecision::Login,
            redirect: Some(format!("/login?returnUrl=courses/{course_id}")),
        }
    }

    pub fn checkout(course_id: CourseId) -> Self {
        Self {
            decision: AccessDecision::Checkout,
            redirect: Some(format!("/checkout?course={course_id}")),
        }
    }
}
