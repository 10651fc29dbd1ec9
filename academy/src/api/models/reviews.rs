//! API request/response models for course reviews.

use crate::db::models::reviews::ReviewDBResponse;
use crate::types::{CourseId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name shown for reviewers without a profile name
pub const ANONYMOUS_REVIEWER: &str = "Anonymous";

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReviewId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub course_id: CourseId,
    pub rating: i32,
    pub review_text: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewer_name: String,
    pub reviewer_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
}

impl From<ReviewDBResponse> for ReviewResponse {
    fn from(db: ReviewDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            course_id: db.course_id,
            rating: db.rating,
            review_text: db.review_text,
            is_featured: db.is_featured,
            created_at: db.created_at,
            updated_at: db.updated_at,
            reviewer_name: db
                .reviewer_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| ANONYMOUS_REVIEWER.to_string()),
            reviewer_avatar: db.reviewer_avatar,
            course_title: db.course_title,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreate {
    pub rating: i32,
    pub review_text: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub rating: Option<i32>,
    pub review_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedUpdate {
    pub is_featured: bool,
}

/// Count of reviews per star rating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RatingDistribution {
    #[serde(rename = "1")]
    pub one: i64,
    #[serde(rename = "2")]
    pub two: i64,
    #[serde(rename = "3")]
    pub three: i64,
    #[serde(rename = "4")]
    pub four: i64,
    #[serde(rename = "5")]
    pub five: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Mean rating rounded to two decimals, 0 without reviews
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub average_rating: Decimal,
    pub total_reviews: i64,
    pub rating_distribution: RatingDistribution,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HasReviewedResponse {
    pub has_reviewed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewResponse>,
}

/// A page of the public review wall
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<ReviewResponse>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}
