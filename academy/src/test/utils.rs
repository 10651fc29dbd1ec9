//! Test utilities for integration testing
use crate::{
    api::models::users::CurrentUser,
    auth::{
        password::{Argon2Params, hash_string_with_params},
        session,
    },
    config::{Config, DummyConfig, EmailTransportConfig, PasswordConfig, PaymentConfig, PoolSettings},
    db::{
        handlers::{Courses, Quizzes, Repository, Users},
        models::{
            courses::{CourseCreateDBRequest, CourseDBResponse, LessonCreateDBRequest, LessonDBResponse, ModuleCreateDBRequest},
            quizzes::{OptionCreateDBRequest, QuestionCreateDBRequest, QuizCreateDBRequest, QuizWithQuestions},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
};
use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Password of every user made by [`create_test_user`]
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");
    app.into_test_server()
}

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("academy-test-emails-{}", std::process::id()));

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        payment: PaymentConfig::Dummy(DummyConfig { succeed_payments: true }),
        ..Default::default()
    };

    config.database.url = "Something".to_string(); // Will get overriden by env var
    config.database.pool = PoolSettings {
        max_connections: 4,
        min_connections: 1,
        ..Default::default()
    };
    config.auth.password = PasswordConfig {
        min_length: 8,
        max_length: 64,
        // Ultra-weak params for fast testing (DO NOT USE IN PRODUCTION)
        argon2_memory_kib: 128,
        argon2_iterations: 1,
        argon2_parallelism: 1,
    };
    config.auth.session.cookie_secure = false;
    config.email.transport = EmailTransportConfig::File {
        path: temp_dir.to_string_lossy().to_string(),
    };
    config.checkout.send_welcome_email = false;

    config
}

fn fast_hash(password: &str) -> String {
    hash_string_with_params(password, Argon2Params::from(&create_test_config().auth.password)).expect("Failed to hash test password")
}

pub async fn create_test_user(pool: &PgPool, is_admin: bool) -> UserDBResponse {
    let email = format!("student-{}@example.com", Uuid::new_v4().simple());
    create_test_user_with_password(pool, &email, TEST_PASSWORD, is_admin).await
}

pub async fn create_test_user_with_password(pool: &PgPool, email: &str, password: &str, is_admin: bool) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            full_name: Some("Test Student".to_string()),
            is_admin,
            password_hash: Some(fast_hash(password)),
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_course(pool: &PgPool, title: &str) -> CourseDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Courses::new(&mut conn)
        .create_course(&CourseCreateDBRequest {
            title: title.to_string(),
            description: format!("{title} for new traders"),
            instructor: "Brave Mentor".to_string(),
            price: Decimal::new(29700, 2),
            thumbnail: None,
            duration: Some("6 weeks".to_string()),
        })
        .await
        .expect("Failed to create test course")
}

/// Create a module in the course holding a single lesson
pub async fn create_test_lesson(pool: &PgPool, course_id: Uuid) -> LessonDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut courses = Courses::new(&mut conn);
    let module = courses
        .create_module(&ModuleCreateDBRequest {
            course_id,
            title: "Getting started".to_string(),
            description: None,
            order_index: 0,
            has_quiz: false,
        })
        .await
        .expect("Failed to create test module");

    courses
        .create_lesson(&LessonCreateDBRequest {
            module_id: module.id,
            title: "What is a pip?".to_string(),
            video_url: Some("123456789".to_string()),
            duration: 305,
            order_index: 0,
            is_free: false,
        })
        .await
        .expect("Failed to create test lesson")
}

/// Create a quiz module with two questions. The first option of each question is correct.
pub async fn create_test_quiz(pool: &PgPool, course_id: Uuid) -> QuizWithQuestions {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    let module = Courses::new(&mut conn)
        .create_module(&ModuleCreateDBRequest {
            course_id,
            title: "Risk management".to_string(),
            description: None,
            order_index: 1,
            has_quiz: true,
        })
        .await
        .expect("Failed to create quiz module");

    let mut quizzes = Quizzes::new(&mut conn);
    let quiz = quizzes
        .create_quiz(&QuizCreateDBRequest {
            module_id: module.id,
            title: "Risk management check".to_string(),
            description: None,
            passing_score: 70,
        })
        .await
        .expect("Failed to create quiz");

    let questions = [
        ("How much should you risk per trade?", ["1-2% of the account", "Half the account", "Everything"]),
        ("What does a stop loss do?", ["Caps the loss on a trade", "Doubles the position", "Nothing"]),
    ];
    for (question_index, (text, options)) in questions.iter().enumerate() {
        let question = quizzes
            .create_question(&QuestionCreateDBRequest {
                quiz_id: quiz.id,
                question_text: text.to_string(),
                order_index: question_index as i32,
            })
            .await
            .expect("Failed to create question");
        for (option_index, option) in options.iter().enumerate() {
            quizzes
                .create_option(&OptionCreateDBRequest {
                    question_id: question.id,
                    option_text: option.to_string(),
                    is_correct: option_index == 0,
                    order_index: option_index as i32,
                })
                .await
                .expect("Failed to create option");
        }
    }

    quizzes
        .get_for_module(module.id)
        .await
        .expect("Failed to load quiz")
        .expect("Quiz should exist")
}

/// `Authorization` header value carrying a session token for the user
pub fn bearer_for(user: &UserDBResponse) -> String {
    let token = session::create_session_token(&CurrentUser::from(user.clone()), &create_test_config())
        .expect("Failed to create session token");
    format!("Bearer {token}")
}

/// `Cookie` header value carrying a session token for the user
pub fn session_cookie_for(user: &UserDBResponse) -> String {
    let config = create_test_config();
    let token = session::create_session_token(&CurrentUser::from(user.clone()), &config).expect("Failed to create session token");
    format!("{}={token}", config.auth.session.cookie_name)
}
