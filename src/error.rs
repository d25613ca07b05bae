use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Machine-readable error codes returned in the `error.code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidQuery,
    RateLimitExceeded,
    UpstreamOverloaded,
    #[serde(rename = "GBIF_TIMEOUT")]
    GbifTimeout,
    #[serde(rename = "GBIF_UNAVAILABLE")]
    GbifUnavailable,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidQuery(String),
    #[error("Too many requests")]
    RateLimitExceeded,
    #[error("Upstream service is overloaded")]
    UpstreamOverloaded,
    #[error("GBIF request timed out")]
    GbifTimeout,
    #[error("GBIF service is unavailable")]
    GbifUnavailable,
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamOverloaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GbifTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::GbifUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::InvalidQuery(_) => ErrorCode::InvalidQuery,
            ApiError::RateLimitExceeded => ErrorCode::RateLimitExceeded,
            ApiError::UpstreamOverloaded => ErrorCode::UpstreamOverloaded,
            ApiError::GbifTimeout => ErrorCode::GbifTimeout,
            ApiError::GbifUnavailable => ErrorCode::GbifUnavailable,
            ApiError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal error while handling request");
        }
        (self.status(), Json(ErrorResponse::from_api_error(&self))).into_response()
    }
}

/// Failure reported by the upstream search collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Timeout => ApiError::GbifTimeout,
            UpstreamError::Unavailable(_) => ApiError::GbifUnavailable,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.to_string(),
            },
        }
    }

    pub fn from_api_error(err: &ApiError) -> Self {
        Self::new(err.code(), &err.to_string())
    }
}
