use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    api::models::{
        admin::{AdminOverview, PaymentsQuery, PaymentsReport, StudentResponse},
        enrollments::{EnrollmentResponse, EnrollmentStatus, GrantEnrollmentRequest},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::current_user::AdminUser,
    db::{
        errors::DbError,
        handlers::{Courses, Enrollments, Repository, Users, analytics, users::UserFilter},
        models::enrollments::EnrollmentCreateDBRequest,
    },
    errors::Error,
};

/// Revenue, students, ratings and recent activity
#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    tag = "admin",
    responses(
        (status = 200, description = "Dashboard figures", body = AdminOverview),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_overview(State(state): State<AppState>, AdminUser(_admin): AdminUser) -> Result<Json<AdminOverview>, Error> {
    Ok(Json(analytics::get_admin_overview(&state.db, Utc::now()).await?))
}

/// Student profiles, newest first, with their enrollment counts
#[utoipa::path(
    get,
    path = "/api/v1/admin/students",
    tag = "admin",
    params(Pagination),
    responses(
        (status = 200, description = "Page of students", body = PaginatedResponse<StudentResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<PaginatedResponse<StudentResponse>>, Error> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut conn);

    let students = users.list_students(&UserFilter::new(skip, limit)).await?;
    let total = users.count_profiles().await?;

    Ok(Json(PaginatedResponse::new(
        students.into_iter().map(StudentResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Payments in a time range with totals
#[utoipa::path(
    get,
    path = "/api/v1/admin/payments",
    tag = "admin",
    params(PaymentsQuery),
    responses(
        (status = 200, description = "Payments report", body = PaymentsReport),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<PaymentsReport>, Error> {
    Ok(Json(analytics::get_payments_report(&state.db, query.range, Utc::now()).await?))
}

/// Enroll a student without payment
#[utoipa::path(
    post,
    path = "/api/v1/admin/enrollments",
    tag = "admin",
    request_body = GrantEnrollmentRequest,
    responses(
        (status = 201, description = "Enrollment granted", body = EnrollmentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User or course not found"),
        (status = 409, description = "Already enrolled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn grant_enrollment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<GrantEnrollmentRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    if Users::new(&mut conn).get_by_id(request.user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: request.user_id.to_string(),
        });
    }
    if Courses::new(&mut conn).get_by_id(request.course_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Course".to_string(),
            id: request.course_id.to_string(),
        });
    }

    let enrollment = Enrollments::new(&mut conn)
        .create(&EnrollmentCreateDBRequest {
            user_id: request.user_id,
            course_id: request.course_id,
            status: request.status.unwrap_or(EnrollmentStatus::Active),
            expires_at: request.expires_at,
            payment_id: None,
            purchased_by: Some(admin.id),
        })
        .await?;

    tracing::info!(
        "Admin {} granted user {} access to course {}",
        admin.id,
        request.user_id,
        request.course_id
    );
    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from(enrollment))))
}
