//! Input rules for account creation, shared by registration and checkout.

use crate::{config::PasswordConfig, errors::Error};

fn bad_request(message: impl Into<String>) -> Error {
    Error::BadRequest { message: message.into() }
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the domain
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i < domain.len() - 1)
}

pub fn validate_email(email: &str) -> Result<(), Error> {
    if email.is_empty() {
        return Err(bad_request("Email is required"));
    }
    if !is_valid_email(email) {
        return Err(bad_request("Please enter a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str, policy: &PasswordConfig) -> Result<(), Error> {
    if password.is_empty() {
        return Err(bad_request("Password is required"));
    }
    let length = password.chars().count();
    if length < policy.min_length {
        return Err(bad_request(format!("Password must be at least {} characters", policy.min_length)));
    }
    if length > policy.max_length {
        return Err(bad_request(format!("Password must be at most {} characters", policy.max_length)));
    }
    Ok(())
}

/// Returns the trimmed name
pub fn validate_full_name(full_name: &str) -> Result<String, Error> {
    let trimmed = full_name.trim();
    if trimmed.chars().count() < 2 {
        return Err(bad_request("Please enter your full name"));
    }
    Ok(trimmed.to_string())
}

/// Canonical form used for lookups and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
