//! Database repository for lesson progress and course resume points.

use crate::db::{
    errors::Result,
    models::progress::{CourseResumeDBResponse, LessonProgressDBResponse, LessonProgressUpsertDBRequest},
};
use crate::types::{CourseId, LessonId, ModuleId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Progress<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Progress<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), lesson_id = %abbrev_uuid(&request.lesson_id)), err)]
    pub async fn upsert_lesson(&mut self, request: &LessonProgressUpsertDBRequest) -> Result<LessonProgressDBResponse> {
        let progress = sqlx::query_as::<_, LessonProgressDBResponse>(
            r#"
            INSERT INTO lesson_progress (user_id, lesson_id, last_position, progress_percentage, completed, last_updated)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                last_position = EXCLUDED.last_position,
                progress_percentage = EXCLUDED.progress_percentage,
                completed = EXCLUDED.completed,
                last_updated = NOW()
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.lesson_id)
        .bind(request.last_position.max(0))
        .bind(request.progress_percentage.clamp(0, 100))
        .bind(request.completed)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(progress)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), lesson_id = %abbrev_uuid(&lesson_id)), err)]
    pub async fn get_lesson(&mut self, user_id: UserId, lesson_id: LessonId) -> Result<Option<LessonProgressDBResponse>> {
        let progress = sqlx::query_as::<_, LessonProgressDBResponse>("SELECT * FROM lesson_progress WHERE user_id = $1 AND lesson_id = $2")
            .bind(user_id)
            .bind(lesson_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(progress)
    }

    /// Progress rows for every lesson of a course, in course order
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn list_for_course(&mut self, user_id: UserId, course_id: CourseId) -> Result<Vec<LessonProgressDBResponse>> {
        let rows = sqlx::query_as::<_, LessonProgressDBResponse>(
            r#"
            SELECT lp.*
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE lp.user_id = $1 AND m.course_id = $2
            ORDER BY m.order_index ASC, l.order_index ASC
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn count_completed(&mut self, user_id: UserId, course_id: CourseId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE lp.user_id = $1 AND m.course_id = $2 AND lp.completed
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn get_resume(&mut self, user_id: UserId, course_id: CourseId) -> Result<Option<CourseResumeDBResponse>> {
        let resume = sqlx::query_as::<_, CourseResumeDBResponse>("SELECT * FROM course_resume WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(resume)
    }

    /// Remember the last watched lesson. Clears any active quiz.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn set_last_lesson(&mut self, user_id: UserId, course_id: CourseId, lesson_id: LessonId) -> Result<CourseResumeDBResponse> {
        self.write_resume(user_id, course_id, Some(lesson_id), None).await
    }

    /// Remember the quiz the student has open. Clears the last watched lesson.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn set_active_quiz(&mut self, user_id: UserId, course_id: CourseId, module_id: ModuleId) -> Result<CourseResumeDBResponse> {
        self.write_resume(user_id, course_id, None, Some(module_id)).await
    }

    /// Forget the active quiz, keeping the last watched lesson
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn clear_active_quiz(&mut self, user_id: UserId, course_id: CourseId) -> Result<()> {
        sqlx::query("UPDATE course_resume SET active_quiz_module_id = NULL, updated_at = NOW() WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    async fn write_resume(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
        last_lesson_id: Option<LessonId>,
        active_quiz_module_id: Option<ModuleId>,
    ) -> Result<CourseResumeDBResponse> {
        let resume = sqlx::query_as::<_, CourseResumeDBResponse>(
            r#"
            INSERT INTO course_resume (user_id, course_id, last_lesson_id, active_quiz_module_id, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, course_id) DO UPDATE SET
                last_lesson_id = EXCLUDED.last_lesson_id,
                active_quiz_module_id = EXCLUDED.active_quiz_module_id,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(last_lesson_id)
        .bind(active_quiz_module_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(resume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{create_test_course, create_test_lesson, create_test_user};
    use sqlx::PgPool;

    fn upsert(user_id: UserId, lesson_id: LessonId, completed: bool) -> LessonProgressUpsertDBRequest {
        LessonProgressUpsertDBRequest {
            user_id,
            lesson_id,
            last_position: 42,
            progress_percentage: if completed { 100 } else { 40 },
            completed,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upsert_overwrites_previous_progress(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let lesson = create_test_lesson(&pool, course.id).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Progress::new(&mut conn);

        assert!(repo.get_lesson(user.id, lesson.id).await.unwrap().is_none());

        let first = repo.upsert_lesson(&upsert(user.id, lesson.id, false)).await.unwrap();
        assert!(!first.completed);
        let second = repo.upsert_lesson(&upsert(user.id, lesson.id, true)).await.unwrap();
        assert!(second.completed);
        assert!(second.last_updated >= first.last_updated);

        assert_eq!(repo.count_completed(user.id, course.id).await.unwrap(), 1);
        assert_eq!(repo.list_for_course(user.id, course.id).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_resume_targets_are_exclusive(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let lesson = create_test_lesson(&pool, course.id).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Progress::new(&mut conn);

        let resume = repo.set_last_lesson(user.id, course.id, lesson.id).await.unwrap();
        assert_eq!(resume.last_lesson_id, Some(lesson.id));
        assert_eq!(resume.active_quiz_module_id, None);

        let resume = repo.set_active_quiz(user.id, course.id, lesson.module_id).await.unwrap();
        assert_eq!(resume.last_lesson_id, None);
        assert_eq!(resume.active_quiz_module_id, Some(lesson.module_id));

        repo.clear_active_quiz(user.id, course.id).await.unwrap();
        let resume = repo.get_resume(user.id, course.id).await.unwrap().unwrap();
        assert_eq!(resume.active_quiz_module_id, None);
    }
}
