use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::users::{AuthResponse, AuthSuccessResponse, CurrentUser, GuestCheckResponse, LoginRequest, RegisterRequest, SessionResponse, UserResponse},
    auth::{
        guards,
        password::{self, Argon2Params},
        session,
        validation::{normalize_email, validate_email, validate_full_name, validate_password},
    },
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::Error,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some(INVALID_CREDENTIALS.to_string()),
    }
}

/// Build the session cookie response for a freshly authenticated user
fn session_response(state: &AppState, status: StatusCode, user: UserResponse, message: &str) -> Result<SessionResponse<AuthResponse>, Error> {
    let current_user = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        is_admin: user.is_admin,
        full_name: user.full_name.clone(),
    };
    let token = session::create_session_token(&current_user, &state.config)?;

    Ok(SessionResponse {
        status,
        body: AuthResponse {
            user,
            message: message.to_string(),
        },
        cookie: session::create_session_cookie(&token, &state.config),
    })
}

/// Register a new student account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "User already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<SessionResponse<AuthResponse>, Error> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let email = normalize_email(&request.email);
    validate_email(&email)?;
    validate_password(&request.password, &state.config.auth.password)?;
    let full_name = validate_full_name(&request.full_name)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email already exists".to_string(),
        });
    }

    let password_hash = password::hash_password(request.password, Argon2Params::from(&state.config.auth.password)).await?;

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email,
            full_name: Some(full_name),
            is_admin: false,
            password_hash: Some(password_hash),
        })
        .await?;

    tracing::info!("Registered user {}", created_user.id);
    session_response(&state, StatusCode::CREATED, UserResponse::from(created_user), "Registration successful")
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<SessionResponse<AuthResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo
        .get_user_by_email(&normalize_email(&request.email))
        .await?
        .ok_or_else(invalid_credentials)?;

    // Accounts without a password cannot log in this way
    let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;
    if !password::verify_password(request.password, hash).await? {
        return Err(invalid_credentials());
    }

    user_repo.record_login(user.id).await?;

    session_response(&state, StatusCode::OK, UserResponse::from(user), "Login successful")
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> SessionResponse<AuthSuccessResponse> {
    SessionResponse {
        status: StatusCode::OK,
        body: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: session::expired_session_cookie(&state.config),
    }
}

/// Whether guest-only pages (login, register) should be shown
#[utoipa::path(
    get,
    path = "/authentication/guest",
    tag = "authentication",
    responses(
        (status = 200, description = "Guest check", body = GuestCheckResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn guest_check(user: Option<CurrentUser>) -> Json<GuestCheckResponse> {
    Json(guards::guest_check(user.as_ref()))
}

#[cfg(test)]
mod tests {
    use crate::test::utils::{TEST_PASSWORD, bearer_for, create_test_app, create_test_app_with_config, create_test_config, create_test_user};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_success(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/authentication/register")
            .json(&json!({
                "email": "  New.Trader@Example.com ",
                "password": "password123",
                "fullName": "  New Trader "
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("academy_session="));
        assert!(cookie.contains("HttpOnly"));

        let body: Value = response.json();
        assert_eq!(body["user"]["email"], "new.trader@example.com");
        assert_eq!(body["user"]["fullName"], "New Trader");
        assert_eq!(body["user"]["isAdmin"], false);
        assert_eq!(body["message"], "Registration successful");

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE email = 'new.trader@example.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(profiles, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_validation_messages(pool: PgPool) {
        let server = create_test_app(pool).await;

        let cases = [
            (json!({"email": "", "password": "password123", "fullName": "Ada"}), "Email is required"),
            (json!({"email": "not-an-email", "password": "password123", "fullName": "Ada"}), "Please enter a valid email address"),
            (json!({"email": "ada@example.com", "password": "short", "fullName": "Ada"}), "Password must be at least 8 characters"),
            (json!({"email": "ada@example.com", "password": "password123", "fullName": " A "}), "Please enter your full name"),
        ];

        for (body, message) in cases {
            let response = server.post("/authentication/register").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.text(), message);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_duplicate_email(pool: PgPool) {
        let existing = create_test_user(&pool, false).await;
        let server = create_test_app(pool).await;

        let response = server
            .post("/authentication/register")
            .json(&json!({
                "email": existing.email.to_uppercase(),
                "password": "password123",
                "fullName": "Someone Else"
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["message"], "An account with this email already exists");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_disabled(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let server = create_test_app_with_config(pool, config).await;

        let response = server
            .post("/authentication/register")
            .json(&json!({"email": "ada@example.com", "password": "password123", "fullName": "Ada"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_and_logout(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/authentication/login")
            .json(&json!({"email": user.email, "password": TEST_PASSWORD}))
            .await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_some());
        let body: Value = response.json();
        assert_eq!(body["message"], "Login successful");

        let last_login: Option<chrono::DateTime<chrono::Utc>> = sqlx::query_scalar("SELECT last_login FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(last_login.is_some());

        let response = server.post("/authentication/logout").await;
        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_failures_share_one_message(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let server = create_test_app(pool).await;

        let wrong_password = server
            .post("/authentication/login")
            .json(&json!({"email": user.email, "password": "not-the-password"}))
            .await;
        wrong_password.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.text(), "Invalid email or password");

        let unknown_email = server
            .post("/authentication/login")
            .json(&json!({"email": "nobody@example.com", "password": TEST_PASSWORD}))
            .await;
        unknown_email.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.text(), "Invalid email or password");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_guest_check(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let server = create_test_app(pool).await;

        let body: Value = server.get("/authentication/guest").await.json();
        assert_eq!(body, json!({"allowed": true}));

        let body: Value = server
            .get("/authentication/guest")
            .add_header("authorization", bearer_for(&user))
            .await
            .json();
        assert_eq!(body, json!({"allowed": false, "redirect": "/dashboard"}));
    }
}
