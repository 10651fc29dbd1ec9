//! Database repository for the course content tree: courses, modules and lessons.

use crate::db::{
    errors::Result,
    models::courses::{
        CourseCreateDBRequest, CourseDBResponse, LessonCreateDBRequest, LessonDBResponse, ModuleCreateDBRequest, ModuleDBResponse,
    },
};
use crate::types::{CourseId, LessonId, ModuleId, abbrev_uuid};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use tracing::instrument;

/// A course with its modules and their lessons, all in display order
#[derive(Debug, Clone)]
pub struct CourseTree {
    pub course: CourseDBResponse,
    pub modules: Vec<(ModuleDBResponse, Vec<LessonDBResponse>)>,
}

pub struct Courses<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Courses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// All courses, oldest first
    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<CourseDBResponse>> {
        let courses = sqlx::query_as::<_, CourseDBResponse>("SELECT * FROM courses ORDER BY created_at ASC")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(courses)
    }

    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: CourseId) -> Result<Option<CourseDBResponse>> {
        let course = sqlx::query_as::<_, CourseDBResponse>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(course)
    }

    /// Load a course with its modules (by `order_index`) and each module's lessons (by `order_index`)
    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&id)), err)]
    pub async fn get_tree(&mut self, id: CourseId) -> Result<Option<CourseTree>> {
        let Some(course) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let modules = sqlx::query_as::<_, ModuleDBResponse>(
            "SELECT * FROM modules WHERE course_id = $1 ORDER BY order_index ASC, created_at ASC",
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        let module_ids: Vec<ModuleId> = modules.iter().map(|m| m.id).collect();
        let lessons = sqlx::query_as::<_, LessonDBResponse>(
            "SELECT * FROM lessons WHERE module_id = ANY($1) ORDER BY order_index ASC, created_at ASC",
        )
        .bind(&module_ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut by_module: HashMap<ModuleId, Vec<LessonDBResponse>> = HashMap::new();
        for lesson in lessons {
            by_module.entry(lesson.module_id).or_default().push(lesson);
        }

        let modules = modules
            .into_iter()
            .map(|m| {
                let lessons = by_module.remove(&m.id).unwrap_or_default();
                (m, lessons)
            })
            .collect();

        Ok(Some(CourseTree { course, modules }))
    }

    #[instrument(skip(self), fields(module_id = %abbrev_uuid(&id)), err)]
    pub async fn get_module(&mut self, id: ModuleId) -> Result<Option<ModuleDBResponse>> {
        let module = sqlx::query_as::<_, ModuleDBResponse>("SELECT * FROM modules WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(module)
    }

    /// The course a lesson belongs to
    #[instrument(skip(self), fields(lesson_id = %abbrev_uuid(&id)), err)]
    pub async fn course_id_for_lesson(&mut self, id: LessonId) -> Result<Option<CourseId>> {
        let course_id = sqlx::query_scalar::<_, CourseId>(
            "SELECT m.course_id FROM lessons l JOIN modules m ON m.id = l.module_id WHERE l.id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(course_id)
    }

    /// Number of lessons across all modules of a course
    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&id)), err)]
    pub async fn count_lessons(&mut self, id: CourseId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lessons l JOIN modules m ON m.id = l.module_id WHERE m.course_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    pub async fn create_course(&mut self, request: &CourseCreateDBRequest) -> Result<CourseDBResponse> {
        let course = sqlx::query_as::<_, CourseDBResponse>(
            r#"
            INSERT INTO courses (title, description, instructor, price, thumbnail, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.instructor)
        .bind(request.price)
        .bind(&request.thumbnail)
        .bind(&request.duration)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(course)
    }

    #[instrument(skip(self, request), fields(course_id = %abbrev_uuid(&request.course_id)), err)]
    pub async fn create_module(&mut self, request: &ModuleCreateDBRequest) -> Result<ModuleDBResponse> {
        let module = sqlx::query_as::<_, ModuleDBResponse>(
            r#"
            INSERT INTO modules (course_id, title, description, order_index, has_quiz)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.course_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.order_index)
        .bind(request.has_quiz)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(module)
    }

    /// Insert a lesson and keep the course's `total_lessons` in step
    #[instrument(skip(self, request), fields(module_id = %abbrev_uuid(&request.module_id)), err)]
    pub async fn create_lesson(&mut self, request: &LessonCreateDBRequest) -> Result<LessonDBResponse> {
        let mut tx = self.db.begin().await?;

        let lesson = sqlx::query_as::<_, LessonDBResponse>(
            r#"
            INSERT INTO lessons (module_id, title, video_url, duration, order_index, is_free)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.module_id)
        .bind(&request.title)
        .bind(&request.video_url)
        .bind(request.duration)
        .bind(request.order_index)
        .bind(request.is_free)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE courses SET total_lessons = total_lessons + 1, updated_at = NOW() WHERE id = (SELECT course_id FROM modules WHERE id = $1)",
        )
        .bind(request.module_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(lesson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn course_request(title: &str) -> CourseCreateDBRequest {
        CourseCreateDBRequest {
            title: title.to_string(),
            description: "Learn to trade".to_string(),
            instructor: "Brave".to_string(),
            price: Decimal::new(29700, 2),
            thumbnail: None,
            duration: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_courses_oldest_first(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);

        let first = repo.create_course(&course_request("Forex Basics")).await.unwrap();
        let second = repo.create_course(&course_request("Advanced Price Action")).await.unwrap();

        let courses = repo.list().await.unwrap();
        let ids: Vec<_> = courses.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_course_tree_is_ordered(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);

        let course = repo.create_course(&course_request("Forex Basics")).await.unwrap();
        let second = repo
            .create_module(&ModuleCreateDBRequest {
                course_id: course.id,
                title: "Second".to_string(),
                description: None,
                order_index: 2,
                has_quiz: true,
            })
            .await
            .unwrap();
        let first = repo
            .create_module(&ModuleCreateDBRequest {
                course_id: course.id,
                title: "First".to_string(),
                description: None,
                order_index: 1,
                has_quiz: false,
            })
            .await
            .unwrap();

        for (order_index, title) in [(2, "b"), (1, "a")] {
            repo.create_lesson(&LessonCreateDBRequest {
                module_id: first.id,
                title: title.to_string(),
                video_url: Some("123".to_string()),
                duration: 60,
                order_index,
                is_free: false,
            })
            .await
            .unwrap();
        }

        let tree = repo.get_tree(course.id).await.unwrap().unwrap();
        assert_eq!(tree.modules.len(), 2);
        assert_eq!(tree.modules[0].0.id, first.id);
        assert_eq!(tree.modules[1].0.id, second.id);
        assert!(tree.modules[1].0.has_quiz);

        let titles: Vec<_> = tree.modules[0].1.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert!(tree.modules[1].1.is_empty());

        assert_eq!(repo.count_lessons(course.id).await.unwrap(), 2);
        assert_eq!(tree.course.total_lessons, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_course(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Courses::new(&mut conn);
        assert!(repo.get_tree(uuid::Uuid::new_v4()).await.unwrap().is_none());
    }
}
