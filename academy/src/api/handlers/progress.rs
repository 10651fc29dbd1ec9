use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::Acquire;

use crate::{
    AppState,
    api::models::{
        progress::{CourseProgressResponse, LessonProgressResponse, LessonProgressUpdate, ResumeResponse, ResumeUpdate},
        users::CurrentUser,
    },
    auth::guards,
    content::completion_percent,
    db::{
        errors::DbError,
        handlers::{Courses, Enrollments, Progress},
        models::progress::LessonProgressUpsertDBRequest,
    },
    errors::Error,
    types::{CourseId, LessonId},
};

/// Completed lesson count and percentage for the caller in a course
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/progress",
    tag = "progress",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course progress", body = CourseProgressResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_course_progress(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<CourseProgressResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let total_lessons = Courses::new(&mut conn).count_lessons(course_id).await?;
    let mut progress = Progress::new(&mut conn);
    let completed_lessons = progress.count_completed(user.id, course_id).await?;
    let lessons = progress.list_for_course(user.id, course_id).await?;

    Ok(Json(CourseProgressResponse {
        course_id,
        completed_lessons,
        total_lessons,
        progress: completion_percent(completed_lessons, total_lessons),
        lessons: lessons.into_iter().map(LessonProgressResponse::from).collect(),
    }))
}

/// Get the caller's progress on one lesson; `null` before the lesson was first opened
#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}/progress",
    tag = "progress",
    params(("lesson_id" = uuid::Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson progress", body = Option<LessonProgressResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_lesson_progress(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
    user: CurrentUser,
) -> Result<Json<Option<LessonProgressResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let course_id = guards::course_for_lesson(&mut conn, lesson_id).await?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let progress = Progress::new(&mut conn).get_lesson(user.id, lesson_id).await?;
    Ok(Json(progress.map(LessonProgressResponse::from)))
}

/// Save the caller's progress on a lesson and refresh the course percentage on the enrollment
#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}/progress",
    tag = "progress",
    request_body = LessonProgressUpdate,
    params(("lesson_id" = uuid::Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Saved lesson progress", body = LessonProgressResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn save_lesson_progress(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
    user: CurrentUser,
    Json(update): Json<LessonProgressUpdate>,
) -> Result<Json<LessonProgressResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let course_id = guards::course_for_lesson(&mut conn, lesson_id).await?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let mut tx = conn.begin().await.map_err(DbError::from)?;

    let mut progress = Progress::new(&mut tx);
    let saved = progress
        .upsert_lesson(&LessonProgressUpsertDBRequest {
            user_id: user.id,
            lesson_id,
            last_position: update.last_position,
            progress_percentage: update.progress_percentage,
            completed: update.completed,
        })
        .await?;
    let completed_lessons = progress.count_completed(user.id, course_id).await?;
    let total_lessons = Courses::new(&mut tx).count_lessons(course_id).await?;

    Enrollments::new(&mut tx)
        .update_progress(user.id, course_id, completion_percent(completed_lessons, total_lessons))
        .await?;

    tx.commit().await.map_err(DbError::from)?;

    Ok(Json(LessonProgressResponse::from(saved)))
}

/// Where the caller left off in a course; `null` when nothing was recorded
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/resume",
    tag = "progress",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Resume point", body = Option<ResumeResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_resume(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<Json<Option<ResumeResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let resume = Progress::new(&mut conn).get_resume(user.id, course_id).await?;
    Ok(Json(resume.map(ResumeResponse::from)))
}

/// Record the lesson or the quiz to resume. Exactly one of the two must be given.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{course_id}/resume",
    tag = "progress",
    request_body = ResumeUpdate,
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Saved resume point", body = ResumeResponse),
        (status = 400, description = "Neither or both targets given, or target outside the course"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn set_resume(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
    Json(update): Json<ResumeUpdate>,
) -> Result<Json<ResumeResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    let outside_course = || Error::BadRequest {
        message: "Resume target does not belong to this course".to_string(),
    };

    let resume = match (update.last_lesson_id, update.active_quiz_module_id) {
        (Some(lesson_id), None) => {
            if guards::course_for_lesson(&mut conn, lesson_id).await? != course_id {
                return Err(outside_course());
            }
            Progress::new(&mut conn).set_last_lesson(user.id, course_id, lesson_id).await?
        }
        (None, Some(module_id)) => {
            if guards::course_for_module(&mut conn, module_id).await? != course_id {
                return Err(outside_course());
            }
            Progress::new(&mut conn).set_active_quiz(user.id, course_id, module_id).await?
        }
        _ => {
            return Err(Error::BadRequest {
                message: "Provide either lastLessonId or activeQuizModuleId".to_string(),
            });
        }
    };

    Ok(Json(ResumeResponse::from(resume)))
}

/// Forget the quiz the caller had open, keeping the last lesson
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{course_id}/resume/quiz",
    tag = "progress",
    params(("course_id" = uuid::Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Active quiz cleared"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn clear_active_quiz(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    guards::require_enrollment(&mut conn, &user, course_id).await?;

    Progress::new(&mut conn).clear_active_quiz(user.id, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
