//! Service error types with HTTP status code mapping.
//!
//! [`RiskError`] is the central error type for the crate. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": 1000,
///     "message": "invalid configuration: cell size must be > 0, got 0"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false` for error responses.
    pub success: bool,
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`RiskError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                     |
/// |-----------|-----------------|---------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                 |
/// | 2000–2999 | Not Found       | 404 Not Found                   |
/// | 3000–3999 | Server/Upstream | 500 / 502 Bad Gateway / 504     |
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    /// Engine or service configuration is invalid. Never clamped.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An earthquake record failed validation.
    #[error("invalid earthquake record: {0}")]
    InvalidEarthquake(String),

    /// Earthquake with the given store ID was not found.
    #[error("earthquake not found: {0}")]
    EarthquakeNotFound(i64),

    /// The event store could not supply the lookback window.
    #[error("event store unavailable: {0}")]
    UpstreamFetch(String),

    /// The event store did not answer within the fetch timeout.
    #[error("event store timed out after {timeout_secs} s")]
    UpstreamTimeout {
        /// Configured fetch timeout in seconds.
        timeout_secs: u64,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RiskError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidConfig(_) => 1000,
            Self::InvalidRequest(_) => 1001,
            Self::InvalidEarthquake(_) => 1002,
            Self::EarthquakeNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::UpstreamFetch(_) => 3002,
            Self::UpstreamTimeout { .. } => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidConfig(_) | Self::InvalidRequest(_) | Self::InvalidEarthquake(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::EarthquakeNotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for RiskError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for RiskError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for RiskError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<sqlx::Error> for RiskError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_bad_requests() {
        let err = RiskError::InvalidConfig("cell size must be > 0".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1000);
    }

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        assert_eq!(
            RiskError::UpstreamFetch("down".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RiskError::UpstreamTimeout { timeout_secs: 30 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn into_response_carries_status() {
        let response = RiskError::EarthquakeNotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
