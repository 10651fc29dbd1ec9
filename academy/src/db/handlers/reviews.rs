//! Database repository for course reviews.

use crate::db::{
    errors::{DbError, Result},
    models::reviews::{RatingCount, ReviewCreateDBRequest, ReviewDBResponse, ReviewUpdateDBRequest},
};
use crate::types::{CourseId, ReviewId, UserId, abbrev_uuid};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;

/// Number of reviews shown on the landing page
pub const FEATURED_LIMIT: i64 = 10;

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.course_id, r.rating, r.review_text, r.is_featured, r.created_at, r.updated_at,
           p.full_name AS reviewer_name, p.avatar_url AS reviewer_avatar, c.title AS course_title
    FROM reviews r
    LEFT JOIN profiles p ON p.id = r.user_id
    LEFT JOIN courses c ON c.id = r.course_id
"#;

/// Average, count and per-star counts for a course's reviews
#[derive(Debug, Clone)]
pub struct ReviewAggregate {
    pub average: Option<Decimal>,
    pub total: i64,
    pub counts: Vec<RatingCount>,
}

pub struct Reviews<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reviews<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), course_id = %abbrev_uuid(&request.course_id)), err)]
    pub async fn create(&mut self, request: &ReviewCreateDBRequest) -> Result<ReviewDBResponse> {
        let id = sqlx::query_scalar::<_, ReviewId>(
            "INSERT INTO reviews (user_id, course_id, rating, review_text) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(request.user_id)
        .bind(request.course_id)
        .bind(request.rating)
        .bind(&request.review_text)
        .fetch_one(&mut *self.db)
        .await?;
        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ReviewId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, ReviewDBResponse>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(review)
    }

    /// The user's own review of a course
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn get_for_user(&mut self, user_id: UserId, course_id: CourseId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, ReviewDBResponse>(&format!("{REVIEW_SELECT} WHERE r.user_id = $1 AND r.course_id = $2"))
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(review)
    }

    /// Reviews of a course, newest first
    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn list_for_course(&mut self, course_id: CourseId) -> Result<Vec<ReviewDBResponse>> {
        let reviews = sqlx::query_as::<_, ReviewDBResponse>(&format!("{REVIEW_SELECT} WHERE r.course_id = $1 ORDER BY r.created_at DESC"))
            .bind(course_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(reviews)
    }

    #[instrument(skip(self), err)]
    pub async fn list_featured(&mut self) -> Result<Vec<ReviewDBResponse>> {
        let reviews = sqlx::query_as::<_, ReviewDBResponse>(&format!(
            "{REVIEW_SELECT} WHERE r.is_featured ORDER BY r.created_at DESC LIMIT $1"
        ))
        .bind(FEATURED_LIMIT)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(reviews)
    }

    /// One page of all reviews, newest first, with the total count
    #[instrument(skip(self), err)]
    pub async fn list_page(&mut self, skip: i64, limit: i64) -> Result<(Vec<ReviewDBResponse>, i64)> {
        let reviews = sqlx::query_as::<_, ReviewDBResponse>(&format!("{REVIEW_SELECT} ORDER BY r.created_at DESC LIMIT $1 OFFSET $2"))
            .bind(limit)
            .bind(skip)
            .fetch_all(&mut *self.db)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews")
            .fetch_one(&mut *self.db)
            .await?;
        Ok((reviews, total))
    }

    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn aggregate_for_course(&mut self, course_id: CourseId) -> Result<ReviewAggregate> {
        let (average, total) = sqlx::query_as::<_, (Option<Decimal>, i64)>("SELECT AVG(rating)::NUMERIC, COUNT(*) FROM reviews WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&mut *self.db)
            .await?;
        let counts = sqlx::query_as::<_, RatingCount>(
            "SELECT rating, COUNT(*) AS count FROM reviews WHERE course_id = $1 GROUP BY rating ORDER BY rating",
        )
        .bind(course_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(ReviewAggregate { average, total, counts })
    }

    /// Mean rating across every review
    #[instrument(skip(self), err)]
    pub async fn average_rating(&mut self) -> Result<Option<Decimal>> {
        let average = sqlx::query_scalar::<_, Option<Decimal>>("SELECT AVG(rating)::NUMERIC FROM reviews")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(average)
    }

    /// Update a review. When `owner` is set, only that user's review matches.
    #[instrument(skip(self, request), fields(review_id = %abbrev_uuid(&id)), err)]
    pub async fn update(&mut self, id: ReviewId, owner: Option<UserId>, request: &ReviewUpdateDBRequest) -> Result<ReviewDBResponse> {
        let updated = sqlx::query(
            r#"
            UPDATE reviews SET
                rating = COALESCE($3, rating),
                review_text = COALESCE($4, review_text),
                is_featured = COALESCE($5, is_featured),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(request.rating)
        .bind(&request.review_text)
        .bind(request.is_featured)
        .execute(&mut *self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    /// Delete a review. When `owner` is set, only that user's review matches.
    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: ReviewId, owner: Option<UserId>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(owner)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{create_test_course, create_test_user};
    use sqlx::PgPool;

    fn review(user_id: UserId, course_id: CourseId, rating: i32) -> ReviewCreateDBRequest {
        ReviewCreateDBRequest {
            user_id,
            course_id,
            rating,
            review_text: "Clear explanations of risk management".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_one_review_per_user_and_course(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let created = repo.create(&review(user.id, course.id, 5)).await.unwrap();
        assert!(!created.is_featured);
        assert_eq!(created.course_title.as_deref(), Some("Forex Basics"));

        let err = repo.create(&review(user.id, course.id, 4)).await.unwrap_err();
        assert!(err.is_unique_violation_on("reviews_user_course_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rating_out_of_range_is_rejected(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let err = repo.create(&review(user.id, course.id, 6)).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete_respect_owner(pool: PgPool) {
        let author = create_test_user(&pool, false).await;
        let stranger = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let created = repo.create(&review(author.id, course.id, 3)).await.unwrap();
        let change = ReviewUpdateDBRequest {
            rating: Some(4),
            ..Default::default()
        };

        assert!(matches!(
            repo.update(created.id, Some(stranger.id), &change).await,
            Err(DbError::NotFound)
        ));
        let updated = repo.update(created.id, Some(author.id), &change).await.unwrap();
        assert_eq!(updated.rating, 4);
        assert_eq!(updated.review_text, created.review_text);

        assert!(!repo.delete(created.id, Some(stranger.id)).await.unwrap());
        assert!(repo.delete(created.id, None).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_aggregate_and_featured(pool: PgPool) {
        let course = create_test_course(&pool, "Forex Basics").await;
        let mut ids = Vec::new();
        for rating in [5, 4, 4] {
            let user = create_test_user(&pool, false).await;
            let mut conn = pool.acquire().await.unwrap();
            ids.push(Reviews::new(&mut conn).create(&review(user.id, course.id, rating)).await.unwrap().id);
        }
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let aggregate = repo.aggregate_for_course(course.id).await.unwrap();
        assert_eq!(aggregate.total, 3);
        assert_eq!(aggregate.average.map(|a| a.round_dp(2)), Some(Decimal::new(433, 2)));
        assert_eq!(aggregate.counts.len(), 2);

        let empty = repo.aggregate_for_course(uuid::Uuid::new_v4()).await.unwrap();
        assert_eq!(empty.total, 0);
        assert_eq!(empty.average, None);

        assert!(repo.list_featured().await.unwrap().is_empty());
        repo.update(
            ids[0],
            None,
            &ReviewUpdateDBRequest {
                is_featured: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.list_featured().await.unwrap().len(), 1);

        let (page, total) = repo.list_page(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(total, 3);
    }
}
