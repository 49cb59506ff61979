//! Error taxonomy of the HTTP facade.
//!
//! Every component returns an [`ApiError`]. Collaborator errors are folded into
//! [`ApiError::Dependency`] carrying the collaborator's stable error code, which is what
//! clients see as the response message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use docbridge::{
    blob::BlobStoreError, error::DocumentStoreError, identity::IdentityError, query::QueryError,
};

/// Message returned with every 429 response.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests from this IP, please try again later";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed or missing input, detected before any collaborator call.
    #[error("{0}")]
    Validation(String),
    /// A collaborator failed. `code` is surfaced verbatim.
    #[error("{code}: {detail}")]
    Dependency { code: String, detail: String },
    /// Sign-out without a session cookie.
    #[error("No active session")]
    NoActiveSession,
    /// Sign-out with a forged, expired or revoked session cookie.
    #[error("Invalid session")]
    InvalidSession,
    #[error("Too many requests from this IP, please try again later")]
    RateLimited,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn dependency(code: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::Dependency {
            code: code.into(),
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Dependency { .. } => StatusCode::BAD_REQUEST,
            ApiError::NoActiveSession | ApiError::InvalidSession => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// The client-facing message: the bare code for dependency errors.
    pub fn message(&self) -> String {
        match self {
            ApiError::Dependency { code, .. } => code.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Dependency { code, detail } => {
                tracing::warn!(code = %code, detail = %detail, "dependency call failed");
            },
            ApiError::Validation(message) => {
                tracing::debug!(message = %message, "request rejected");
            },
            _ => {},
        }

        (
            self.status(),
            Json(ErrorBody {
                status: "error",
                message: self.message(),
            }),
        )
            .into_response()
    }
}

impl From<DocumentStoreError> for ApiError {
    fn from(err: DocumentStoreError) -> Self {
        ApiError::dependency(err.code(), err.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::dependency(err.code(), err.to_string())
    }
}

impl From<BlobStoreError> for ApiError {
    fn from(err: BlobStoreError) -> Self {
        ApiError::dependency(err.code(), err.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Validation(err.to_string())
    }
}
