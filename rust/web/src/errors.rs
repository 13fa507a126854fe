//! JSON error bodies and the status/severity mapping shared by every
//! handler.
//!
//! Command rejections from the engine are not errors and never pass through
//! here; they are answered with an outcome body instead.
use serde::{Deserialize, Serialize};
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Standard error response format for all API endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "session_not_found")
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 4xx, expected during normal operation
    Client,
    /// 5xx, needs investigation
    Server,
    /// Shared state can no longer be trusted
    Critical,
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error code
    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    /// Logs at the level matching the severity, then builds the response.
    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let severity = self.severity();
        let body = self.to_error_response();
        log_error(severity, status, &body);
        body.into_response(status)
    }
}

fn log_error(severity: ErrorSeverity, status: StatusCode, body: &ErrorResponse) {
    match severity {
        ErrorSeverity::Client => tracing::info!(
            status = status.as_u16(),
            code = %body.error,
            message = %body.message,
            "client error"
        ),
        ErrorSeverity::Server => tracing::error!(
            status = status.as_u16(),
            code = %body.error,
            message = %body.message,
            "server error"
        ),
        ErrorSeverity::Critical => tracing::error!(
            status = status.as_u16(),
            code = %body.error,
            message = %body.message,
            critical = true,
            "critical error"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Boom;

    impl IntoErrorResponse for Boom {
        fn status_code(&self) -> StatusCode {
            StatusCode::SERVICE_UNAVAILABLE
        }

        fn error_code(&self) -> &'static str {
            "boom"
        }

        fn error_message(&self) -> String {
            "it broke".into()
        }
    }

    #[test]
    fn details_are_omitted_when_absent() {
        let json = serde_json::to_value(ErrorResponse::new("seats_full", "no seat")).unwrap();
        assert_eq!(json["error"], "seats_full");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn details_are_serialized_when_present() {
        let err = ErrorResponse::with_details(
            "player_not_found",
            "unknown player",
            json!({ "player_id": 4 }),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["details"]["player_id"], 4);
        assert_eq!(err.to_string(), "player_not_found: unknown player");
    }

    #[test]
    fn default_severity_follows_status_class() {
        assert_eq!(Boom.severity(), ErrorSeverity::Server);
        let response = Boom.into_http_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
