//! Error types for the Bookclub server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::policy::RejectReason;

/// Numeric error codes reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchMember = 4,
    NoSuchBook = 5,
    BookUnavailable = 7,
    Duplicate = 8,
    MaxBorrowsReached = 11,
    RoleNotPermitted = 12,
    NotCurrentlyBorrowed = 13,
    NotBorrower = 14,
    PreconditionFailed = 15,
    BadValue = 18,
}

impl From<RejectReason> for ErrorCode {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::BookUnavailable => ErrorCode::BookUnavailable,
            RejectReason::BorrowLimitReached { .. } => ErrorCode::MaxBorrowsReached,
            RejectReason::RoleNotPermitted => ErrorCode::RoleNotPermitted,
            RejectReason::NotCurrentlyBorrowed => ErrorCode::NotCurrentlyBorrowed,
            RejectReason::NotBorrower => ErrorCode::NotBorrower,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// A lending policy refusal surfaced to the member
    #[error("Lending refused: {0}")]
    Rejected(RejectReason),

    /// The conditional write lost a race; the client should re-fetch and retry
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::MemberNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchMember),
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue)
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
            AppError::Rejected(reason) => {
                let status = match reason {
                    RejectReason::BookUnavailable | RejectReason::NotCurrentlyBorrowed => {
                        StatusCode::CONFLICT
                    }
                    RejectReason::BorrowLimitReached { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    RejectReason::RoleNotPermitted | RejectReason::NotBorrower => {
                        StatusCode::FORBIDDEN
                    }
                };
                (status, ErrorCode::from(*reason))
            }
            AppError::PreconditionFailed(_) => {
                (StatusCode::CONFLICT, ErrorCode::PreconditionFailed)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::MemberNotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::PreconditionFailed(msg) => msg.clone(),
            AppError::Rejected(reason) => reason.to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
