//! Database models for course reviews.

use crate::types::{CourseId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ReviewCreateDBRequest {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: i32,
    pub review_text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewUpdateDBRequest {
    pub rating: Option<i32>,
    pub review_text: Option<String>,
    pub is_featured: Option<bool>,
}

/// A review joined with the reviewer's profile and the course title
#[derive(Debug, Clone, FromRow)]
pub struct ReviewDBResponse {
    pub id: ReviewId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub rating: i32,
    pub review_text: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewer_name: Option<String>,
    pub reviewer_avatar: Option<String>,
    pub course_title: Option<String>,
}

/// Count of reviews with a given star rating
#[derive(Debug, Clone, Copy, FromRow)]
pub struct RatingCount {
    pub rating: i32,
    pub count: i64,
}
