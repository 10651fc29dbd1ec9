use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::{
        enrollments::{EnrollmentResponse, ProgressUpdate},
        users::CurrentUser,
    },
    auth::guards,
    db::{errors::DbError, handlers::Enrollments},
    errors::Error,
    types::CourseId,
};

/// List the caller's accessible enrollments
#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    tag = "enrollments",
    responses(
        (status = 200, description = "Enrollments, newest first, with course summaries", body = [EnrollmentResponse]),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_enrollments(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<EnrollmentResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let rows = Enrollments::new(&mut conn).list_for_user(user.id).await?;
    Ok(Json(rows.into_iter().map(EnrollmentResponse::from).collect()))
}

/// Get the caller's enrollment in a course, whatever its status
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{course_id}",
    tag = "enrollments",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrollment", body = EnrollmentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No enrollment for this course"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<EnrollmentResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let enrollment = Enrollments::new(&mut conn)
        .get(user.id, course_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Enrollment".to_string(),
            id: course_id.to_string(),
        })?;
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// Set the stored course progress percentage
#[utoipa::path(
    put,
    path = "/api/v1/enrollments/{course_id}/progress",
    tag = "enrollments",
    request_body = ProgressUpdate,
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Updated enrollment", body = EnrollmentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "No accessible enrollment; redirect to checkout"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_progress(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<EnrollmentResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;
    let enrollment = Enrollments::new(&mut conn)
        .update_progress(user.id, course_id, update.progress)
        .await?;
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// Mark the course as completed
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{course_id}/complete",
    tag = "enrollments",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Completed enrollment", body = EnrollmentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "No accessible enrollment; redirect to checkout"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn complete_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<EnrollmentResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;
    let enrollment = Enrollments::new(&mut conn).mark_completed(user.id, course_id).await?;
    tracing::info!("User {} completed course {}", user.id, course_id);
    Ok(Json(EnrollmentResponse::from(enrollment)))
}
