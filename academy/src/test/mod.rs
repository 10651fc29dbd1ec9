//! End-to-end journeys through the full router.

pub mod utils;

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;
use utils::{bearer_for, create_test_app, create_test_course, create_test_lesson, create_test_quiz, create_test_user};

fn intent_id(intent: &Value) -> String {
    intent["clientSecret"]
        .as_str()
        .unwrap()
        .trim_end_matches("_secret_dummy")
        .to_string()
}

fn session_cookie(response: &axum_test::TestResponse) -> String {
    let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
    set_cookie.split(';').next().unwrap().to_string()
}

/// A visitor buys a course, studies it, passes the quiz, finishes and reviews it; the admin sees the sale.
#[sqlx::test]
#[test_log::test]
async fn test_e2e_purchase_to_review(pool: PgPool) {
    let course = create_test_course(&pool, "Forex Foundations").await;
    let lesson = create_test_lesson(&pool, course.id).await;
    let quiz = create_test_quiz(&pool, course.id).await;
    let admin = create_test_user(&pool, true).await;
    let server = create_test_app(pool.clone()).await;

    // Anonymous visitors are sent to login
    let access: Value = server.get(&format!("/api/v1/courses/{}/access", course.id)).await.json();
    assert_eq!(access["decision"], "login");

    let intent: Value = server
        .post("/api/v1/checkout/payment-intent")
        .json(&json!({"courseId": course.id}))
        .await
        .json();
    assert_eq!(intent["verifiedAmount"], 29700);

    let response = server
        .post("/api/v1/checkout/complete")
        .json(&json!({
            "email": "journey@example.com",
            "password": "password123",
            "fullName": "Journey Trader",
            "agreedToTerms": true,
            "paymentIntentId": intent_id(&intent),
            "courseId": course.id,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let cookie = session_cookie(&response);

    let me: Value = server.get("/api/v1/users/current").add_header("cookie", cookie.clone()).await.json();
    assert_eq!(me["email"], "journey@example.com");

    let access: Value = server
        .get(&format!("/api/v1/courses/{}/access", course.id))
        .add_header("cookie", cookie.clone())
        .await
        .json();
    assert_eq!(access["decision"], "granted");

    // Watch the only lesson to the end
    server
        .put(&format!("/api/v1/lessons/{}/progress", lesson.id))
        .add_header("cookie", cookie.clone())
        .json(&json!({"lastPosition": 305, "progressPercentage": 100, "completed": true}))
        .await
        .assert_status_ok();

    let enrollment: Value = server
        .get(&format!("/api/v1/enrollments/{}", course.id))
        .add_header("cookie", cookie.clone())
        .await
        .json();
    assert_eq!(enrollment["progress"], 100);

    // Pass the module quiz
    let answers: Vec<Value> = quiz
        .questions
        .iter()
        .map(|q| json!({"questionId": q.question.id, "selectedOptionId": q.options[0].id}))
        .collect();
    let attempt: Value = server
        .post(&format!("/api/v1/modules/{}/quiz/attempts", quiz.quiz.module_id))
        .add_header("cookie", cookie.clone())
        .json(&json!({"answers": answers}))
        .await
        .json();
    assert_eq!(attempt["score"], 100);
    assert_eq!(attempt["passed"], true);

    let result: Value = server
        .get(&format!("/api/v1/modules/{}/quiz/result", quiz.quiz.module_id))
        .add_header("cookie", cookie.clone())
        .await
        .json();
    assert_eq!(result["hasPassed"], true);

    let completed: Value = server
        .post(&format!("/api/v1/enrollments/{}/complete", course.id))
        .add_header("cookie", cookie.clone())
        .await
        .json();
    assert_eq!(completed["status"], "completed");

    server
        .post(&format!("/api/v1/courses/{}/reviews", course.id))
        .add_header("cookie", cookie.clone())
        .json(&json!({"rating": 5, "reviewText": "Clear and practical"}))
        .await
        .assert_status(StatusCode::CREATED);

    // The processor confirms the charge
    let event = json!({
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": intent_id(&intent), "object": "payment_intent"}}
    });
    server.post("/webhooks/payments").text(event.to_string()).await.assert_status_ok();

    let overview: Value = server
        .get("/api/v1/admin/overview")
        .add_header("authorization", bearer_for(&admin))
        .await
        .json();
    assert_eq!(overview["totalRevenue"], 297.0);
    assert_eq!(overview["successfulPayments"], 1);
    assert_eq!(overview["averageRating"], 5.0);
    assert_eq!(overview["recentEnrollments"][0]["email"], "journey@example.com");

    // Students may not reach the back-office
    server
        .get("/api/v1/admin/overview")
        .add_header("cookie", cookie)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// A registered student without a purchase is pointed at checkout everywhere in the course.
#[sqlx::test]
#[test_log::test]
async fn test_e2e_registered_without_purchase(pool: PgPool) {
    let course = create_test_course(&pool, "Forex Foundations").await;
    let lesson = create_test_lesson(&pool, course.id).await;
    let quiz = create_test_quiz(&pool, course.id).await;
    let server = create_test_app(pool).await;

    let response = server
        .post("/authentication/register")
        .json(&json!({"email": "browser@example.com", "password": "password123", "fullName": "Window Shopper"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let cookie = session_cookie(&response);

    let access: Value = server
        .get(&format!("/api/v1/courses/{}/access", course.id))
        .add_header("cookie", cookie.clone())
        .await
        .json();
    assert_eq!(access["decision"], "checkout");
    assert_eq!(access["redirect"], format!("/checkout?course={}", course.id));

    let response = server
        .get(&format!("/api/v1/lessons/{}/progress", lesson.id))
        .add_header("cookie", cookie.clone())
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["redirect"], format!("/checkout?course={}", course.id));

    server
        .get(&format!("/api/v1/modules/{}/quiz", quiz.quiz.module_id))
        .add_header("cookie", cookie.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // The public catalogue stays open
    let courses: Value = server.get("/api/v1/courses").await.json();
    assert_eq!(courses.as_array().unwrap().len(), 1);

    let enrollments: Value = server.get("/api/v1/enrollments").add_header("cookie", cookie.clone()).await.json();
    assert!(enrollments.as_array().unwrap().is_empty());

    server
        .post("/authentication/logout")
        .add_header("cookie", cookie)
        .await
        .assert_status_ok();
}

/// An admin grants a course by hand; the student can then study it.
#[sqlx::test]
#[test_log::test]
async fn test_e2e_admin_grant(pool: PgPool) {
    let course = create_test_course(&pool, "Forex Foundations").await;
    let lesson = create_test_lesson(&pool, course.id).await;
    let admin = create_test_user(&pool, true).await;
    let student = create_test_user(&pool, false).await;
    let server = create_test_app(pool).await;

    server
        .post("/api/v1/admin/enrollments")
        .add_header("authorization", bearer_for(&admin))
        .json(&json!({"userId": student.id, "courseId": course.id}))
        .await
        .assert_status(StatusCode::CREATED);

    let progress: Value = server
        .get(&format!("/api/v1/courses/{}/progress", course.id))
        .add_header("authorization", bearer_for(&student))
        .await
        .json();
    assert_eq!(progress["totalLessons"], 1);
    assert_eq!(progress["completedLessons"], 0);

    server
        .put(&format!("/api/v1/courses/{}/resume", course.id))
        .add_header("authorization", bearer_for(&student))
        .json(&json!({"lastLessonId": lesson.id}))
        .await
        .assert_status_ok();

    let resume: Value = server
        .get(&format!("/api/v1/courses/{}/resume", course.id))
        .add_header("authorization", bearer_for(&student))
        .await
        .json();
    assert_eq!(resume["lastLessonId"], lesson.id.to_string());

    let students: Value = server
        .get("/api/v1/admin/students")
        .add_header("authorization", bearer_for(&admin))
        .await
        .json();
    assert_eq!(students["totalCount"], 2);
}
