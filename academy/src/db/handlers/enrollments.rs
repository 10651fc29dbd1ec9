//! Database repository for enrollments.

use crate::api::models::enrollments::EnrollmentStatus;
use crate::db::{
    errors::{DbError, Result},
    models::enrollments::{EnrollmentCreateDBRequest, EnrollmentDBResponse, EnrollmentWithCourse, RecentEnrollment},
};
use crate::types::{CourseId, UserId, abbrev_uuid};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

/// Aggregate counts for the admin overview
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct EnrollmentCounts {
    pub total: i64,
    pub active: i64,
}

pub struct Enrollments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Enrollments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), course_id = %abbrev_uuid(&request.course_id)), err)]
    pub async fn create(&mut self, request: &EnrollmentCreateDBRequest) -> Result<EnrollmentDBResponse> {
        // Savepoint when already inside a transaction
        let mut tx = self.db.begin().await?;

        let enrollment = sqlx::query_as::<_, EnrollmentDBResponse>(
            r#"
            INSERT INTO enrollments (user_id, course_id, status, expires_at, payment_id, purchased_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.course_id)
        .bind(request.status)
        .bind(request.expires_at)
        .bind(request.payment_id)
        .bind(request.purchased_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE courses SET students_enrolled = students_enrolled + 1 WHERE id = $1")
            .bind(request.course_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn get(&mut self, user_id: UserId, course_id: CourseId) -> Result<Option<EnrollmentDBResponse>> {
        let enrollment = sqlx::query_as::<_, EnrollmentDBResponse>("SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(enrollment)
    }

    /// Whether the user currently has access to the course
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn is_enrolled(&mut self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        Ok(self
            .get(user_id, course_id)
            .await?
            .is_some_and(|e| e.grants_access(chrono::Utc::now())))
    }

    /// Accessible enrollments with course summaries, newest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<EnrollmentWithCourse>> {
        let rows = sqlx::query_as::<_, EnrollmentWithCourse>(
            r#"
            SELECT e.*, c.title AS course_title, c.thumbnail AS course_thumbnail
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = $1
              AND e.status IN ('active', 'trial', 'completed')
              AND (e.expires_at IS NULL OR e.expires_at > NOW())
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Ids of the courses the user can access
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn course_ids_for_user(&mut self, user_id: UserId) -> Result<Vec<CourseId>> {
        Ok(self.list_for_user(user_id).await?.into_iter().map(|e| e.enrollment.course_id).collect())
    }

    /// Set the stored progress percentage, clamped to 0..=100.
    ///
    /// Only accessible enrollments are updated; anything else is [`DbError::NotFound`].
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn update_progress(&mut self, user_id: UserId, course_id: CourseId, progress: i32) -> Result<EnrollmentDBResponse> {
        sqlx::query_as::<_, EnrollmentDBResponse>(
            r#"
            UPDATE enrollments SET progress = $3, last_accessed_at = NOW()
            WHERE user_id = $1 AND course_id = $2
              AND status IN ('active', 'trial', 'completed')
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(progress.clamp(0, 100))
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)
    }

    /// Complete an accessible enrollment. Refunded, suspended or expired rows are left alone.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn mark_completed(&mut self, user_id: UserId, course_id: CourseId) -> Result<EnrollmentDBResponse> {
        sqlx::query_as::<_, EnrollmentDBResponse>(
            r#"
            UPDATE enrollments SET status = $3, completed_at = NOW(), progress = 100, last_accessed_at = NOW()
            WHERE user_id = $1 AND course_id = $2
              AND status IN ('active', 'trial', 'completed')
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(EnrollmentStatus::Completed)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn touch_last_accessed(&mut self, user_id: UserId, course_id: CourseId) -> Result<()> {
        sqlx::query("UPDATE enrollments SET last_accessed_at = NOW() WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn counts(&mut self) -> Result<EnrollmentCounts> {
        let counts = sqlx::query_as::<_, EnrollmentCounts>(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE status = 'active') AS active FROM enrollments",
        )
        .fetch_one(&mut *self.db)
        .await?;
        Ok(counts)
    }

    /// Most recent enrollments with student and course names
    #[instrument(skip(self), err)]
    pub async fn recent(&mut self, limit: i64) -> Result<Vec<RecentEnrollment>> {
        let rows = sqlx::query_as::<_, RecentEnrollment>(
            r#"
            SELECT e.id, e.user_id, p.email, p.full_name, e.course_id, c.title AS course_title, e.status, e.enrolled_at
            FROM enrollments e
            LEFT JOIN profiles p ON p.id = e.user_id
            LEFT JOIN courses c ON c.id = e.course_id
            ORDER BY e.enrolled_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}
