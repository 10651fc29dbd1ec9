use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    AppState,
    api::models::{
        pagination::{PageQuery, REVIEWS_PAGE_SIZE},
        reviews::{FeaturedUpdate, HasReviewedResponse, RatingDistribution, ReviewCreate, ReviewPage, ReviewResponse, ReviewStats, ReviewUpdate},
        users::CurrentUser,
    },
    auth::{current_user::AdminUser, guards},
    db::{
        errors::DbError,
        handlers::{Reviews, reviews::ReviewAggregate},
        models::reviews::{ReviewCreateDBRequest, ReviewUpdateDBRequest},
    },
    errors::Error,
    types::{CourseId, ReviewId},
};

fn validate_rating(rating: i32) -> Result<i32, Error> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(Error::BadRequest {
            message: "Rating must be between 1 and 5".to_string(),
        })
    }
}

fn validate_review_text(text: &str) -> Result<String, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::BadRequest {
            message: "Please write a few words about the course".to_string(),
        });
    }
    Ok(text.to_string())
}

fn review_not_found(id: ReviewId) -> Error {
    Error::NotFound {
        resource: "Review".to_string(),
        id: id.to_string(),
    }
}

impl From<ReviewAggregate> for ReviewStats {
    fn from(aggregate: ReviewAggregate) -> Self {
        let mut distribution = RatingDistribution::default();
        for c in aggregate.counts {
            match c.rating {
                1 => distribution.one = c.count,
                2 => distribution.two = c.count,
                3 => distribution.three = c.count,
                4 => distribution.four = c.count,
                5 => distribution.five = c.count,
                _ => {}
            }
        }
        Self {
            average_rating: aggregate
                .average
                .unwrap_or(Decimal::ZERO)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            total_reviews: aggregate.total,
            rating_distribution: distribution,
        }
    }
}

/// All reviews, newest first, one page at a time
#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    tag = "reviews",
    params(PageQuery),
    responses((status = 200, description = "Page of reviews with course titles", body = ReviewPage))
)]
#[tracing::instrument(skip_all)]
pub async fn list_reviews(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Result<Json<ReviewPage>, Error> {
    let (skip, limit) = query.params(REVIEWS_PAGE_SIZE);
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let (reviews, total_count) = Reviews::new(&mut conn).list_page(skip, limit).await?;

    Ok(Json(ReviewPage {
        reviews: reviews.into_iter().map(ReviewResponse::from).collect(),
        total_count,
        page: query.page(),
        page_size: REVIEWS_PAGE_SIZE,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/featured",
    tag = "reviews",
    responses((status = 200, description = "Featured reviews, newest first", body = [ReviewResponse]))
)]
#[tracing::instrument(skip_all)]
pub async fn list_featured_reviews(State(state): State<AppState>) -> Result<Json<Vec<ReviewResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let reviews = Reviews::new(&mut conn).list_featured().await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/reviews",
    tag = "reviews",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Course reviews, newest first", body = [ReviewResponse]))
)]
#[tracing::instrument(skip_all)]
pub async fn list_course_reviews(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
) -> Result<Json<Vec<ReviewResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let reviews = Reviews::new(&mut conn).list_for_course(course_id).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// Review a course the caller is enrolled in. One review per student and course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/reviews",
    tag = "reviews",
    request_body = ReviewCreate,
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Invalid rating or empty text"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 409, description = "Already reviewed"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_review(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
    Json(request): Json<ReviewCreate>,
) -> Result<(StatusCode, Json<ReviewResponse>), Error> {
    let rating = validate_rating(request.rating)?;
    let review_text = validate_review_text(&request.review_text)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let review = Reviews::new(&mut conn)
        .create(&ReviewCreateDBRequest {
            user_id: user.id,
            course_id,
            rating,
            review_text,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/reviews/stats",
    tag = "reviews",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Average, total and per-star counts", body = ReviewStats))
)]
#[tracing::instrument(skip_all)]
pub async fn get_review_stats(State(state): State<AppState>, Path(course_id): Path<CourseId>) -> Result<Json<ReviewStats>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let aggregate = Reviews::new(&mut conn).aggregate_for_course(course_id).await?;
    Ok(Json(ReviewStats::from(aggregate)))
}

/// Whether the caller has reviewed the course, with their review
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/reviews/mine",
    tag = "reviews",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "The caller's review, if any", body = HasReviewedResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_my_review(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<HasReviewedResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let review = Reviews::new(&mut conn).get_for_user(user.id, course_id).await?;
    Ok(Json(HasReviewedResponse {
        has_reviewed: review.is_some(),
        review: review.map(ReviewResponse::from),
    }))
}

/// Edit the caller's own review
#[utoipa::path(
    patch,
    path = "/api/v1/reviews/{review_id}",
    tag = "reviews",
    request_body = ReviewUpdate,
    params(("review_id" = uuid::Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Updated review", body = ReviewResponse),
        (status = 400, description = "Invalid rating or empty text"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such review owned by the caller"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    user: CurrentUser,
    Json(request): Json<ReviewUpdate>,
) -> Result<Json<ReviewResponse>, Error> {
    let update = ReviewUpdateDBRequest {
        rating: request.rating.map(validate_rating).transpose()?,
        review_text: request.review_text.as_deref().map(validate_review_text).transpose()?,
        is_featured: None,
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let review = Reviews::new(&mut conn)
        .update(review_id, Some(user.id), &update)
        .await
        .map_err(|e| match e {
            DbError::NotFound => review_not_found(review_id),
            other => Error::Database(other),
        })?;
    Ok(Json(ReviewResponse::from(review)))
}

/// Delete the caller's own review. Admins may delete any review.
#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{review_id}",
    tag = "reviews",
    params(("review_id" = uuid::Uuid, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such review owned by the caller"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    user: CurrentUser,
) -> Result<StatusCode, Error> {
    let owner = (!user.is_admin).then_some(user.id);
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    if !Reviews::new(&mut conn).delete(review_id, owner).await? {
        return Err(review_not_found(review_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Feature or unfeature a review on the landing page
#[utoipa::path(
    patch,
    path = "/api/v1/admin/reviews/{review_id}/featured",
    tag = "admin",
    request_body = FeaturedUpdate,
    params(("review_id" = uuid::Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Updated review", body = ReviewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Review not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn set_featured(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<FeaturedUpdate>,
) -> Result<Json<ReviewResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let review = Reviews::new(&mut conn)
        .update(
            review_id,
            None,
            &ReviewUpdateDBRequest {
                is_featured: Some(request.is_featured),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| match e {
            DbError::NotFound => review_not_found(review_id),
            other => Error::Database(other),
        })?;
    Ok(Json(ReviewResponse::from(review)))
}
