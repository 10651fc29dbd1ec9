use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::{
        quizzes::{QuizAttemptResponse, QuizResponse, QuizResultResponse, QuizSubmission},
        users::CurrentUser,
    },
    auth::guards,
    db::{
        errors::DbError,
        handlers::Quizzes,
        models::quizzes::{QuizAttemptCreateDBRequest, QuizWithQuestions},
    },
    errors::Error,
    grading,
    types::ModuleId,
};

/// Check enrollment in the module's course and load its quiz
async fn load_quiz(conn: &mut PgConnection, user: &CurrentUser, module_id: ModuleId) -> Result<QuizWithQuestions, Error> {
    let course_id = guards::course_for_module(conn, module_id).await?;
    guards::require_enrollment(conn, user, course_id).await?;

    Quizzes::new(conn).get_for_module(module_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Quiz for module".to_string(),
        id: module_id.to_string(),
    })
}

/// Get the module's quiz, without the answer key
#[utoipa::path(
    get,
    path = "/api/v1/modules/{module_id}/quiz",
    tag = "quizzes",
    params(("module_id" = uuid::Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Quiz with questions and options in display order", body = QuizResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Module or quiz not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    user: CurrentUser,
) -> Result<Json<QuizResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let quiz = load_quiz(&mut conn, &user, module_id).await?;
    Ok(Json(QuizResponse::from(quiz)))
}

/// List the caller's attempts at the module's quiz, newest first
#[utoipa::path(
    get,
    path = "/api/v1/modules/{module_id}/quiz/attempts",
    tag = "quizzes",
    params(("module_id" = uuid::Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Attempts", body = [QuizAttemptResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Module or quiz not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_attempts(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    user: CurrentUser,
) -> Result<Json<Vec<QuizAttemptResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let quiz = load_quiz(&mut conn, &user, module_id).await?;

    let attempts = Quizzes::new(&mut conn).list_attempts(user.id, quiz.quiz.id).await?;
    Ok(Json(attempts.into_iter().map(QuizAttemptResponse::from).collect()))
}

/// Grade and store an attempt at the module's quiz
#[utoipa::path(
    post,
    path = "/api/v1/modules/{module_id}/quiz/attempts",
    tag = "quizzes",
    request_body = QuizSubmission,
    params(("module_id" = uuid::Uuid, Path, description = "Module ID")),
    responses(
        (status = 201, description = "Graded attempt", body = QuizAttemptResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Module or quiz not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    user: CurrentUser,
    Json(submission): Json<QuizSubmission>,
) -> Result<(StatusCode, Json<QuizAttemptResponse>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let quiz = load_quiz(&mut conn, &user, module_id).await?;

    let grade = grading::grade(&quiz, &submission.answers);
    tracing::debug!(
        "Graded quiz {}: {}/{} correct, score {}",
        quiz.quiz.id,
        grade.correct_answers,
        grade.total_questions,
        grade.score
    );

    let attempt = Quizzes::new(&mut conn)
        .insert_attempt(&QuizAttemptCreateDBRequest {
            user_id: user.id,
            quiz_id: quiz.quiz.id,
            module_id,
            score: grade.score,
            total_questions: grade.total_questions,
            correct_answers: grade.correct_answers,
            passed: grade.passed,
            answers: grade.answers,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(QuizAttemptResponse::from(attempt))))
}

/// Whether the caller has passed the module's quiz, with the best passing attempt
#[utoipa::path(
    get,
    path = "/api/v1/modules/{module_id}/quiz/result",
    tag = "quizzes",
    params(("module_id" = uuid::Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Quiz result", body = QuizResultResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Module or quiz not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_result(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    user: CurrentUser,
) -> Result<Json<QuizResultResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let quiz = load_quiz(&mut conn, &user, module_id).await?;

    let mut quizzes = Quizzes::new(&mut conn);
    let best_attempt = quizzes.best_passed_attempt(user.id, quiz.quiz.id).await?;
    let attempt_count = quizzes.count_attempts(user.id, quiz.quiz.id).await?;

    Ok(Json(QuizResultResponse {
        has_passed: best_attempt.is_some(),
        best_attempt: best_attempt.map(QuizAttemptResponse::from),
        attempt_count,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::enrollments::EnrollmentStatus;
    use crate::db::handlers::Enrollments;
    use crate::db::models::enrollments::EnrollmentCreateDBRequest;
    use crate::test::utils::{bearer_for, create_test_app, create_test_course, create_test_lesson, create_test_quiz, create_test_user};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    async fn enroll(pool: &PgPool, user_id: uuid::Uuid, course_id: uuid::Uuid) {
        let mut conn = pool.acquire().await.unwrap();
        Enrollments::new(&mut conn)
            .create(&EnrollmentCreateDBRequest {
                user_id,
                course_id,
                status: EnrollmentStatus::Active,
                expires_at: None,
                payment_id: None,
                purchased_by: None,
            })
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_student_view_hides_answer_key(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let quiz = create_test_quiz(&pool, course.id).await;
        enroll(&pool, user.id, course.id).await;

        let server = create_test_app(pool).await;
        let body: Value = server
            .get(&format!("/api/v1/modules/{}/quiz", quiz.quiz.module_id))
            .add_header("authorization", bearer_for(&user))
            .await
            .json();

        assert_eq!(body["passingScore"], 70);
        let questions = body["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0]["options"].as_array().unwrap().len(), 3);
        assert!(questions[0]["options"][0].get("isCorrect").is_none());
        assert!(!body.to_string().contains("isCorrect"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_attempts_are_graded_and_numbered(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let quiz = create_test_quiz(&pool, course.id).await;
        enroll(&pool, user.id, course.id).await;

        let server = create_test_app(pool).await;
        let auth = bearer_for(&user);
        let attempts_path = format!("/api/v1/modules/{}/quiz/attempts", quiz.quiz.module_id);
        let q1 = &quiz.questions[0];
        let q2 = &quiz.questions[1];

        // One right, one wrong: 50% is below the 70% bar
        let response = server
            .post(&attempts_path)
            .add_header("authorization", auth.clone())
            .json(&json!({"answers": [
                {"questionId": q1.question.id, "selectedOptionId": q1.options[0].id},
                {"questionId": q2.question.id, "selectedOptionId": q2.options[2].id},
            ]}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let first: Value = response.json();
        assert_eq!(first["score"], 50);
        assert_eq!(first["correctAnswers"], 1);
        assert_eq!(first["passed"], false);
        assert_eq!(first["attemptNumber"], 1);

        let result: Value = server
            .get(&format!("/api/v1/modules/{}/quiz/result", quiz.quiz.module_id))
            .add_header("authorization", auth.clone())
            .await
            .json();
        assert_eq!(result["hasPassed"], false);
        assert!(result.get("bestAttempt").is_none());

        // A foreign option on q2 counts as wrong, q1 right, so still 50%; then a full pass
        let response = server
            .post(&attempts_path)
            .add_header("authorization", auth.clone())
            .json(&json!({"answers": [
                {"questionId": q1.question.id, "selectedOptionId": q1.options[0].id},
                {"questionId": q2.question.id, "selectedOptionId": q1.options[0].id},
            ]}))
            .await;
        let second: Value = response.json();
        assert_eq!(second["score"], 50);
        assert_eq!(second["attemptNumber"], 2);

        let third: Value = server
            .post(&attempts_path)
            .add_header("authorization", auth.clone())
            .json(&json!({"answers": [
                {"questionId": q1.question.id, "selectedOptionId": q1.options[0].id},
                {"questionId": q2.question.id, "selectedOptionId": q2.options[0].id},
            ]}))
            .await
            .json();
        assert_eq!(third["score"], 100);
        assert_eq!(third["passed"], true);
        assert_eq!(third["attemptNumber"], 3);

        let attempts: Value = server.get(&attempts_path).add_header("authorization", auth.clone()).await.json();
        let attempts = attempts.as_array().unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0]["attemptNumber"], 3);

        let result: Value = server
            .get(&format!("/api/v1/modules/{}/quiz/result", quiz.quiz.module_id))
            .add_header("authorization", auth)
            .await
            .json();
        assert_eq!(result["hasPassed"], true);
        assert_eq!(result["attemptCount"], 3);
        assert_eq!(result["bestAttempt"]["attemptNumber"], 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_quiz_requires_enrollment_and_existing_quiz(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let course = create_test_course(&pool, "Forex Basics").await;
        let quiz = create_test_quiz(&pool, course.id).await;
        let lesson = create_test_lesson(&pool, course.id).await;

        let server = create_test_app(pool.clone()).await;
        server
            .get(&format!("/api/v1/modules/{}/quiz", quiz.quiz.module_id))
            .add_header("authorization", bearer_for(&user))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        enroll(&pool, user.id, course.id).await;
        server
            .get(&format!("/api/v1/modules/{}/quiz", lesson.module_id))
            .add_header("authorization", bearer_for(&user))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get(&format!("/api/v1/modules/{}/quiz", quiz.quiz.module_id))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
