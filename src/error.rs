use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepoError;

/// ServiceError
///
/// The complete failure taxonomy surfaced by the service layer. Every variant
/// carries a stable machine-readable kind plus a human-readable message; the
/// transport layer maps each kind to exactly one HTTP status.
///
/// None of these are retryable except `StorageUnavailable`.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Client input is structurally malformed. Raised before authorization
    /// or storage are consulted.
    #[error("{0}")]
    Validation(String),

    /// No identity, or credentials that do not resolve to one.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but not authorized for the attempted action.
    #[error("operation not permitted")]
    Forbidden,

    /// The addressed resource does not exist. Never used to mask an
    /// authorization denial.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness invariant was violated.
    #[error("{0}")]
    Conflict(String),

    /// Transient storage failure. Safe to retry with backoff. The internal
    /// error text is logged, never sent to the caller.
    #[error("storage temporarily unavailable")]
    StorageUnavailable,
}

impl ServiceError {
    /// Stable machine-readable kind, independent of the display message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::Forbidden => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::StorageUnavailable => "storage_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// ErrorBody
///
/// The wire envelope for every failure response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable kind, e.g. "conflict".
    pub code: String,
    pub message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Translation from storage-level to business-level errors. This is the only
/// place repository failures gain business meaning; the repository itself
/// never interprets authorization or validation concerns.
impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ServiceError::NotFound("record"),
            RepoError::Conflict(msg) => ServiceError::Conflict(msg),
            RepoError::Unavailable(detail) => {
                // The detail stays in the logs; the caller sees a generic kind.
                tracing::error!("repository unavailable: {detail}");
                ServiceError::StorageUnavailable
            }
        }
    }
}
