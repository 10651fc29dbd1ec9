//! Database models for the course content tree.

use crate::api::models::courses::ResourceType;
use crate::types::{CourseId, LessonId, ModuleId, ResourceId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CourseDBResponse {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub instructor: String,
    /// List price in whole currency units
    pub price: Decimal,
    pub currency: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub total_lessons: i32,
    pub rating: Option<Decimal>,
    pub students_enrolled: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ModuleDBResponse {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub has_quiz: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct LessonDBResponse {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    /// Length in seconds
    pub duration: i32,
    pub order_index: i32,
    pub is_free: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResourceDBResponse {
    pub id: ResourceId,
    pub module_id: ModuleId,
    pub title: String,
    pub url: String,
    #[sqlx(rename = "type")]
    pub resource_type: ResourceType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CourseCreateDBRequest {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub price: Decimal,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModuleCreateDBRequest {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub has_quiz: bool,
}

#[derive(Debug, Clone)]
pub struct LessonCreateDBRequest {
    pub module_id: ModuleId,
    pub title: String,
    pub video_url: Option<String>,
    pub duration: i32,
    pub order_index: i32,
    pub is_free: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceCreateDBRequest {
    pub module_id: ModuleId,
    pub title: String,
    pub url: String,
    pub resource_type: ResourceType,
}
