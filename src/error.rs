//! Error types for the proxy
//!
//! Provides unified error handling using thiserror. Every failure that can
//! reach a client is an [`ApiError`] variant; the variant is the error kind
//! and is mapped to an HTTP status and a JSON body in one place.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

// == Field Violation ==
/// A single failed query-parameter check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Offending query parameter
    pub field: String,
    /// Human-readable explanation
    pub message: String,
    /// Raw value as received, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: value.map(str::to_string),
        }
    }
}

// == Api Error Enum ==
/// Unified error type for the proxy.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Query parameters failed validation
    #[error("{message}")]
    ValidationFailed {
        message: String,
        details: Vec<FieldViolation>,
    },

    /// Client exceeded a rate-limit window
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: String,
        retry_after_secs: u64,
    },

    /// Upstream did not answer within the request timeout
    #[error("{0}")]
    UpstreamTimeout(String),

    /// Upstream host could not be reached
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Upstream answered with a non-success status
    #[error("{message} (upstream status {status})")]
    UpstreamError {
        message: String,
        status: u16,
        body: Option<Value>,
    },

    /// Cache store fault
    #[error("Cache error: {0}")]
    Cache(String),

    /// No route matched
    #[error("{0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Cache(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Taxonomy tag reported in the `type` field of error bodies.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ApiError::ValidationFailed { .. } => "VALIDATION_ERROR",
            ApiError::RateLimited { .. } => "RATE_LIMIT_ERROR",
            ApiError::UpstreamTimeout(_)
            | ApiError::UpstreamUnavailable(_)
            | ApiError::UpstreamError { .. } => "NASA_API_ERROR",
            ApiError::Cache(_) => "CACHE_ERROR",
            ApiError::NotFound(_) | ApiError::Internal(_) => "API_ERROR",
        }
    }

    /// Builds a validation error from collected violations.
    pub fn validation(details: Vec<FieldViolation>) -> Self {
        ApiError::ValidationFailed {
            message: "Validation failed".to_string(),
            details,
        }
    }

    /// Client-facing message, without upstream decoration.
    fn public_message(&self) -> String {
        match self {
            ApiError::ValidationFailed { message, .. }
            | ApiError::RateLimited { message, .. }
            | ApiError::UpstreamError { message, .. } => message.clone(),
            ApiError::UpstreamTimeout(msg)
            | ApiError::UpstreamUnavailable(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Cache(_) | ApiError::Internal(_) => "Internal Server Error".to_string(),
        }
    }

    /// Renders the shared error body.
    pub fn to_body(&self) -> ErrorResponse {
        let status = self.status_code().as_u16();
        let mut body = ErrorResponse::new(self.public_message(), status, self.type_tag());
        match self {
            ApiError::ValidationFailed { details, .. } => {
                body.details = Some(details.clone());
            }
            ApiError::RateLimited { retry_after, .. } => {
                body.retry_after = Some(retry_after.clone());
            }
            _ => {}
        }
        body
    }

    fn log(&self) {
        match self {
            ApiError::ValidationFailed { details, .. } => {
                warn!(violations = details.len(), "Validation failed: {:?}", details);
            }
            ApiError::RateLimited { message, .. } => warn!("Rate limit error: {}", message),
            ApiError::NotFound(msg) => warn!("Not found: {}", msg),
            ApiError::UpstreamError { status, body, .. } => {
                error!(status, upstream_body = ?body, "Upstream error: {}", self);
            }
            ApiError::UpstreamTimeout(_) | ApiError::UpstreamUnavailable(_) => {
                error!("Upstream failure: {}", self);
            }
            ApiError::Cache(_) | ApiError::Internal(_) => error!("{}", self),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let mut response = (status, Json(self.to_body())).into_response();

        if let ApiError::RateLimited {
            retry_after_secs, ..
        } = &self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the proxy.
pub type Result<T> = std::result::Result<T, ApiError>;
