use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure categories surfaced by the API gateway.
///
/// `Display` is the user-facing message: the server's own message when it
/// sent one, otherwise a default for the status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{message}")]
    ServerError { status: u16, message: String },

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error - please check your connection and try again")]
    Network { detail: String },

    #[error("{0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized - please sign in again";
pub const FORBIDDEN_MESSAGE: &str = "Access forbidden";
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";
pub const VALIDATION_MESSAGE: &str = "Validation error";
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded - please wait before retrying";
pub const SERVER_ERROR_MESSAGE: &str = "Server error";
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response format. Please try again.";
pub const ADMIN_REQUIRED_MESSAGE: &str = "Admin access required";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Pull a human-readable message out of an error payload.
    fn server_message(payload: &Value) -> Option<String> {
        ["message", "detail", "error"]
            .iter()
            .filter_map(|key| payload.get(*key)?.as_str())
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Classify a non-success response. Returns the error and the raw
    /// payload (JSON when it parses, the truncated text otherwise).
    pub fn from_status(status: StatusCode, body: &str) -> (Self, Option<Value>) {
        let payload = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(Self::truncate_body(body))),
            )
        };

        let server_message = payload.as_ref().and_then(Self::server_message);
        let message = |default: &str| server_message.clone().unwrap_or_else(|| default.to_string());

        let error = match status.as_u16() {
            401 => ApiError::Unauthorized(message(UNAUTHORIZED_MESSAGE)),
            403 => ApiError::AccessDenied(message(FORBIDDEN_MESSAGE)),
            404 => ApiError::NotFound(message(NOT_FOUND_MESSAGE)),
            422 => ApiError::Validation(message(VALIDATION_MESSAGE)),
            429 => ApiError::RateLimited(message(RATE_LIMITED_MESSAGE)),
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                message: message(SERVER_ERROR_MESSAGE),
            },
            code => ApiError::Http {
                status: code,
                message: message(&format!("HTTP error {}", code)),
            },
        };
        (error, payload)
    }

    pub fn network(err: &reqwest::Error) -> Self {
        ApiError::Network {
            detail: err.to_string(),
        }
    }

    /// HTTP status behind this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Validation(_) => Some(422),
            ApiError::RateLimited(_) => Some(429),
            ApiError::ServerError { status, .. } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_wins() {
        let (err, payload) =
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message": "Server error"}"#);
        assert_eq!(
            err,
            ApiError::ServerError {
                status: 500,
                message: "Server error".to_string()
            }
        );
        assert_eq!(err.to_string(), "Server error");
        assert_eq!(payload, Some(serde_json::json!({"message": "Server error"})));
    }

    #[test]
    fn test_detail_used_when_no_message() {
        let (err, _) = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Email already registered"}"#,
        );
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_status_defaults() {
        let cases = [
            (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE),
            (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE),
            (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
            (StatusCode::UNPROCESSABLE_ENTITY, VALIDATION_MESSAGE),
            (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE),
            (StatusCode::BAD_GATEWAY, SERVER_ERROR_MESSAGE),
            (StatusCode::IM_A_TEAPOT, "HTTP error 418"),
        ];
        for (status, expected) in cases {
            let (err, payload) = ApiError::from_status(status, "");
            assert_eq!(err.to_string(), expected, "status {}", status);
            assert_eq!(payload, None);
        }
    }

    #[test]
    fn test_non_json_body_is_kept_truncated() {
        let body = "x".repeat(600);
        let (err, payload) = ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, &body);
        assert_eq!(err.to_string(), SERVER_ERROR_MESSAGE);
        match payload {
            Some(Value::String(s)) => {
                assert!(s.starts_with(&"x".repeat(500)));
                assert!(s.contains("truncated, 600 total bytes"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_flags() {
        let (err, _) = ApiError::from_status(StatusCode::UNAUTHORIZED, "{}");
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert_eq!(ApiError::Cancelled.status(), None);
    }
}
