//! Database repository for module resources (downloads attached to modules).

use crate::db::{
    errors::Result,
    models::courses::{ResourceCreateDBRequest, ResourceDBResponse},
};
use crate::types::{CourseId, ModuleId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Resources<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Resources<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(module_id = %abbrev_uuid(&module_id)), err)]
    pub async fn list_by_module(&mut self, module_id: ModuleId) -> Result<Vec<ResourceDBResponse>> {
        let resources = sqlx::query_as::<_, ResourceDBResponse>(
            "SELECT * FROM resources WHERE module_id = $1 ORDER BY created_at ASC",
        )
        .bind(module_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(resources)
    }

    /// Resources of every module in a course, in module order
    #[instrument(skip(self), fields(course_id = %abbrev_uuid(&course_id)), err)]
    pub async fn list_by_course(&mut self, course_id: CourseId) -> Result<Vec<ResourceDBResponse>> {
        let resources = sqlx::query_as::<_, ResourceDBResponse>(
            r#"
            SELECT r.* FROM resources r
            JOIN modules m ON m.id = r.module_id
            WHERE m.course_id = $1
            ORDER BY m.order_index ASC, r.created_at ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(resources)
    }

    #[instrument(skip(self, request), fields(module_id = %abbrev_uuid(&request.module_id)), err)]
    pub async fn create(&mut self, request: &ResourceCreateDBRequest) -> Result<ResourceDBResponse> {
        let resource = sqlx::query_as::<_, ResourceDBResponse>(
            "INSERT INTO resources (module_id, title, url, type) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(request.module_id)
        .bind(&request.title)
        .bind(&request.url)
        .bind(request.resource_type)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(resource)
    }
}
