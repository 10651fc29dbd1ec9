//! Authentication and authorization.
//!
//! Accounts are email and password. A successful register, login or checkout issues a JWT
//! (claims: user id, email, admin flag) in an HTTP-only session cookie; API clients may send the
//! same token as `Authorization: Bearer <jwt>`.
//!
//! # Modules
//!
//! - [`current_user`]: extractors for the caller ([`crate::api::models::users::CurrentUser`],
//!   `Option<CurrentUser>` and [`current_user::AdminUser`])
//! - [`guards`]: course access and guest-only decisions
//! - [`password`]: Argon2 hashing on the blocking pool
//! - [`session`]: token and cookie handling
//! - [`validation`]: email, password and name rules
//!
//! # Usage in Handlers
//!
//! ```ignore
//! async fn protected_handler(user: CurrentUser) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", user.email))
//! }
//!
//! async fn admin_handler(AdminUser(admin): AdminUser) -> Result<String, Error> {
//!     Ok(format!("Welcome back, {}", admin.email))
//! }
//! ```

pub mod current_user;
pub mod guards;
pub mod password;
pub mod session;
pub mod validation;
