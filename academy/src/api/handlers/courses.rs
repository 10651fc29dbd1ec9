use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::{
        courses::{CourseAccessResponse, CourseDetailResponse, CourseResponse, ModuleResponse, ResourceResponse},
        users::CurrentUser,
    },
    auth::guards,
    db::{
        errors::DbError,
        handlers::{Courses, Resources},
    },
    errors::Error,
    types::{CourseId, ModuleId},
};

fn course_not_found(course_id: CourseId) -> Error {
    Error::NotFound {
        resource: "Course".to_string(),
        id: course_id.to_string(),
    }
}

/// List all courses
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    tag = "courses",
    responses(
        (status = 200, description = "Course catalogue, oldest first", body = [CourseResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let courses = Courses::new(&mut conn).list().await?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

/// Get a course with its modules and lessons
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}",
    tag = "courses",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with its curriculum", body = CourseDetailResponse),
        (status = 404, description = "Course not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_course(State(state): State<AppState>, Path(course_id): Path<CourseId>) -> Result<Json<CourseDetailResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let tree = Courses::new(&mut conn)
        .get_tree(course_id)
        .await?
        .ok_or_else(|| course_not_found(course_id))?;

    Ok(Json(CourseDetailResponse {
        course: CourseResponse::from(tree.course),
        modules: tree.modules.into_iter().map(ModuleResponse::from).collect(),
    }))
}

/// Decide whether the caller may open the course player
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/access",
    tag = "courses",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Access decision with redirect target when denied", body = CourseAccessResponse),
        (status = 404, description = "Course not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_course_access(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: Option<CurrentUser>,
) -> Result<Json<CourseAccessResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    if Courses::new(&mut conn).get_by_id(course_id).await?.is_none() {
        return Err(course_not_found(course_id));
    }

    Ok(Json(guards::course_access(&mut conn, user.as_ref(), course_id).await?))
}

/// List downloadable resources across all of a course's modules
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/resources",
    tag = "courses",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course resources", body = [ResourceResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_course_resources(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<Vec<ResourceResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let resources = Resources::new(&mut conn).list_by_course(course_id).await?;
    Ok(Json(resources.into_iter().map(ResourceResponse::from).collect()))
}

/// List downloadable resources of one module
#[utoipa::path(
    get,
    path = "/api/v1/modules/{module_id}/resources",
    tag = "courses",
    params(("module_id" = uuid::Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Module resources", body = [ResourceResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Module not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_module_resources(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    user: CurrentUser,
) -> Result<Json<Vec<ResourceResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let course_id = guards::course_for_module(&mut conn, module_id).await?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let resources = Resources::new(&mut conn).list_by_module(module_id).await?;
    Ok(Json(resources.into_iter().map(ResourceResponse::from).collect()))
}
