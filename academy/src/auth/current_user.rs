//! Extractors for the authenticated caller.
//!
//! A session token is accepted from `Authorization: Bearer <jwt>` or from the session cookie.
//! The header wins when both are present.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Session token from the Authorization header, if it is a Bearer token
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Session token from the session cookie, if present
fn cookie_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}

/// Returns `None` when the request carries no valid session
#[instrument(skip_all)]
pub(crate) fn authenticate(headers: &HeaderMap, config: &Config) -> Option<CurrentUser> {
    let candidates = [bearer_token(headers), cookie_token(headers, &config.auth.session.cookie_name)];

    for token in candidates.into_iter().flatten() {
        match session::verify_session_token(token, config) {
            Ok(user) => {
                debug!("Authenticated user {}", user.id);
                return Some(user);
            }
            Err(e) => trace!("Session token rejected: {:?}", e),
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authenticate(&parts.headers, &state.config).ok_or(Error::Unauthenticated { message: None })
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        Ok(authenticate(&parts.headers, &state.config))
    }
}

/// An authenticated caller with the admin flag set
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(Error::InsufficientPermissions {
                action: "access the admin area".to_string(),
            });
        }
        Ok(AdminUser(user))
    }
}
