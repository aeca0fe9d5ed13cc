use crate::crypto::DecryptionError;
use crate::db::errors::DbError;
use crate::db::models::otp_challenges::VerifyOutcome;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided or not valid
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Authenticated (or identified) but not allowed to proceed
    #[error("{message}")]
    Forbidden { message: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    /// Per-account cap reached
    #[error("{resource} limit of {limit} reached")]
    QuotaExceeded { resource: String, limit: i64 },

    /// A one-time code submission that did not verify
    #[error("OTP rejected: {0:?}")]
    OtpRejected(VerifyOutcome),

    /// Stored secret could not be decrypted
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::QuotaExceeded { .. } => StatusCode::BAD_REQUEST,
            Error::OtpRejected(outcome) => match outcome {
                VerifyOutcome::NotFound => StatusCode::NOT_FOUND,
                VerifyOutcome::Expired | VerifyOutcome::Mismatch => StatusCode::BAD_REQUEST,
                VerifyOutcome::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                VerifyOutcome::Verified => StatusCode::OK,
            },
            Error::Decryption(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { message } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} {id} not found")
            }
            Error::QuotaExceeded { resource, limit } => {
                format!("Maximum number of {resource} reached ({limit})")
            }
            Error::OtpRejected(outcome) => match outcome {
                VerifyOutcome::NotFound => "OTP not found or expired".to_string(),
                VerifyOutcome::Expired => "OTP has expired".to_string(),
                VerifyOutcome::TooManyAttempts => "Too many failed attempts. Please request a new OTP.".to_string(),
                VerifyOutcome::Mismatch => "Invalid OTP".to_string(),
                VerifyOutcome::Verified => "OTP verified".to_string(),
            },
            Error::Decryption(_) | Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("accounts"), Some(c)) if c.contains("email") => {
                        "An account with this email address already exists".to_string()
                    }
                    (Some("accounts"), Some(c)) if c.contains("username") => "This username is already taken".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details server-side at a level matching severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) | Error::Decryption(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::OtpRejected(outcome) => {
                tracing::info!("OTP verification rejected: {:?}", outcome);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::QuotaExceeded { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
