use axum::http::StatusCode;
use thiserror::Error;

/// Unified error type for the service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested entity is missing upstream (e.g. an unknown parameter name).
    #[error("not found: {0}")]
    NotFound(String),

    /// Another call with the same idempotency key is in flight.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The wrapped business operation itself failed.
    #[error("operation failed: {0}")]
    Operation(String),

    /// A remote store could not be reached.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Stable machine-readable error code surfaced in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Operation(_) => "OPERATION_ERROR",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
