use crate::db::errors::DbError;
use crate::payment_providers::PaymentError;
use crate::types::CourseId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Message shown when a charge went through but the account or enrollment could not be written.
pub const CHECKOUT_INCOMPLETE_MESSAGE: &str = "payment succeeded but account creation failed — contact support";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Authenticated, but the caller may not perform the action
    #[error("Insufficient permissions to {action}")]
    InsufficientPermissions { action: String },

    /// Authenticated, but without an accessible enrollment in the course
    #[error("Not enrolled in course {course_id}")]
    NotEnrolled { course_id: CourseId },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// The payment provider charged the customer, but fulfilment failed afterwards
    #[error("Checkout for payment intent {payment_intent_id} could not be fulfilled: {reason}")]
    CheckoutIncomplete { payment_intent_id: String, reason: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// Conflict error, e.g. for duplicate submissions
    #[error("Conflict: {message}")]
    Conflict { message: String },
}

/// Friendly message for a unique violation, keyed by constraint name
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_unique") => "An account with this email already exists",
        Some("reviews_user_course_unique") => "You have already reviewed this course",
        Some("coupons_code_unique") => "A coupon with this code already exists",
        Some("enrollments_user_course_unique") => "User is already enrolled in this course",
        Some("payments_payment_intent_id_unique") => "This payment has already been used",
        _ => "Resource already exists",
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } | Error::NotEnrolled { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } | Error::CheckoutIncomplete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Payment(payment_err) => payment_err.status_code(),
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Conflict { .. } => StatusCode::CONFLICT,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action } => format!("Insufficient permissions to {action}"),
            Error::NotEnrolled { .. } => "You are not enrolled in this course".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::CheckoutIncomplete { .. } => CHECKOUT_INCOMPLETE_MESSAGE.to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, .. } => unique_violation_message(constraint.as_deref()).to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Payment(payment_err) => payment_err.user_message(),
            Error::Other(_) => "Internal server error".to_string(),
            Error::Conflict { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) | Error::CheckoutIncomplete { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Payment(_) => {
                tracing::error!("Payment provider error: {}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } | Error::NotEnrolled { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // The frontend sends the student to checkout for this course
            Error::NotEnrolled { course_id } => {
                let body = json!({
                    "message": self.user_message(),
                    "redirect": format!("/checkout?course={course_id}"),
                });
                (status, axum::response::Json(body)).into_response()
            }
            Error::Conflict { message } => (status, axum::response::Json(json!({ "message": message }))).into_response(),
            Error::Database(DbError::UniqueViolation { table, .. }) => {
                let body = json!({
                    "message": self.user_message(),
                    "resource": table.as_deref().unwrap_or("unknown"),
                });
                (status, axum::response::Json(body)).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_review_message() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: Some("reviews_user_course_unique".to_string()),
            table: Some("reviews".to_string()),
            message: "duplicate key value violates unique constraint".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "You have already reviewed this course");
    }

    #[test]
    fn test_checkout_incomplete_hides_reason() {
        let err = Error::CheckoutIncomplete {
            payment_intent_id: "pi_123".to_string(),
            reason: "connection reset".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), CHECKOUT_INCOMPLETE_MESSAGE);
        assert!(err.to_string().contains("pi_123"));
    }

    #[test]
    fn test_not_enrolled_is_forbidden() {
        let err = Error::NotEnrolled { course_id: uuid::Uuid::nil() };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_error_does_not_leak_details() {
        let err = Error::Internal {
            operation: "decrypt the session key".to_string(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }
}
