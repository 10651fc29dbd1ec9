//! Access decisions for course content and guest-only pages.

use crate::{
    api::models::{
        courses::CourseAccessResponse,
        users::{CurrentUser, GuestCheckResponse},
    },
    db::handlers::{Courses, Enrollments},
    errors::{Error, Result},
    types::{CourseId, LessonId, ModuleId, abbrev_uuid},
};
use sqlx::PgConnection;
use tracing::{debug, instrument};

/// Where a logged-in visitor is sent from guest-only pages
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Decide whether the caller may open a course.
///
/// Anonymous callers are sent to login, callers without an accessible enrollment to checkout.
/// A granted decision records the visit on the enrollment.
#[instrument(skip(conn, user), fields(course_id = %abbrev_uuid(&course_id)), err)]
pub async fn course_access(conn: &mut PgConnection, user: Option<&CurrentUser>, course_id: CourseId) -> Result<CourseAccessResponse> {
    let Some(user) = user else {
        return Ok(CourseAccessResponse::login(course_id));
    };

    let mut enrollments = Enrollments::new(conn);
    if !enrollments.is_enrolled(user.id, course_id).await? {
        debug!("User {} is not enrolled in course {}", user.id, course_id);
        return Ok(CourseAccessResponse::checkout(course_id));
    }

    enrollments.touch_last_accessed(user.id, course_id).await?;
    Ok(CourseAccessResponse::granted())
}

/// Fail with [`Error::NotEnrolled`] unless the user has an accessible enrollment.
#[instrument(skip(conn, user), fields(course_id = %abbrev_uuid(&course_id)), err)]
pub async fn require_enrollment(conn: &mut PgConnection, user: &CurrentUser, course_id: CourseId) -> Result<()> {
    let mut enrollments = Enrollments::new(conn);
    if !enrollments.is_enrolled(user.id, course_id).await? {
        return Err(Error::NotEnrolled { course_id });
    }
    enrollments.touch_last_accessed(user.id, course_id).await?;
    Ok(())
}

pub fn guest_check(user: Option<&CurrentUser>) -> GuestCheckResponse {
    match user {
        Some(_) => GuestCheckResponse {
            allowed: false,
            redirect: Some(DASHBOARD_PATH.to_string()),
        },
        None => GuestCheckResponse {
            allowed: true,
            redirect: None,
        },
    }
}

/// Resolve which course a module belongs to, or 404
#[instrument(skip(conn), err)]
pub async fn course_for_module(conn: &mut PgConnection, module_id: ModuleId) -> Result<CourseId> {
    let module = Courses::new(conn)
        .get_module(module_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Module".to_string(),
            id: module_id.to_string(),
        })?;
    Ok(module.course_id)
}

/// Resolve which course a lesson belongs to, or 404
#[instrument(skip(conn), err)]
pub async fn course_for_lesson(conn: &mut PgConnection, lesson_id: LessonId) -> Result<CourseId> {
    Courses::new(conn)
        .course_id_for_lesson(lesson_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Lesson".to_string(),
            id: lesson_id.to_string(),
        })
}
