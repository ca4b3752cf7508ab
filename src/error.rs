//! Unified API error type
//!
//! `ApiError` bridges db-layer errors (`sqlx::Error`, `BoxError`) and the
//! HTTP layer. It enables `?` propagation without manual
//! `.map_err(|e| { tracing::error!(...); ... })` boilerplate in handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation error (400)
    #[error("{message}")]
    Validation { message: String },

    /// Authentication required / failed verification (401)
    #[error("{message}")]
    Unauthorized { message: String },

    /// Resource not found (404)
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Database or infrastructure error (500, auto-logged)
    #[error("Internal error")]
    Internal {
        #[source]
        source: BoxError,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal { source: e.into() }
    }
}

impl From<BoxError> for ApiError {
    fn from(e: BoxError) -> Self {
        Self::Internal { source: e }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { source } = &self {
            tracing::error!(error = %source, "Internal error");
        }
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
