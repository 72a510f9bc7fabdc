//! The uniform result every gateway call resolves to.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

use super::ApiError;

/// Message attached to successful responses.
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome of an API call. Callers never see a transport error directly;
/// every failure is folded into `Failure`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success {
        data: T,
        message: String,
    },
    Failure {
        error: ApiError,
        message: String,
        /// Raw error payload from the server, if any.
        errors: Option<Value>,
    },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success {
            data,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self::failure_with(error, None)
    }

    pub fn failure_with(error: ApiError, errors: Option<Value>) -> Self {
        ApiResponse::Failure {
            message: error.to_string(),
            error,
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => message,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ApiResponse::Success { .. } => None,
            ApiResponse::Failure { error, .. } => Some(error),
        }
    }

    pub fn errors(&self) -> Option<&Value> {
        match self {
            ApiResponse::Success { .. } => None,
            ApiResponse::Failure { errors, .. } => errors.as_ref(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Success { data, message } => ApiResponse::Success {
                data: f(data),
                message,
            },
            ApiResponse::Failure {
                error,
                message,
                errors,
            } => ApiResponse::Failure {
                error,
                message,
                errors,
            },
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            ApiResponse::Success { data, .. } => Ok(data),
            ApiResponse::Failure { error, .. } => Err(error),
        }
    }
}

/// Serializes as `{success, data, message, errors}` with `data: null` on
/// failure.
impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiResponse", 4)?;
        match self {
            ApiResponse::Success { data, message } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
                state.serialize_field("message", message)?;
                state.serialize_field("errors", &Option::<Value>::None)?;
            }
            ApiResponse::Failure {
                message, errors, ..
            } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("data", &Option::<T>::None)?;
                state.serialize_field("message", message)?;
                state.serialize_field("errors", errors)?;
            }
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::success(vec!["Austin"]);
        assert!(response.is_success());
        assert_eq!(response.message(), "Success");
        assert_eq!(
            serde_json::to_value(&response).expect("serialize"),
            json!({"success": true, "data": ["Austin"], "message": "Success", "errors": null})
        );
    }

    #[test]
    fn test_failure_envelope() {
        let response: ApiResponse<Vec<String>> = ApiResponse::failure_with(
            ApiError::ServerError {
                status: 500,
                message: "Server error".into(),
            },
            Some(json!({"message": "Server error"})),
        );
        assert!(!response.is_success());
        assert_eq!(response.message(), "Server error");
        assert_eq!(response.data(), None);
        assert_eq!(
            serde_json::to_value(&response).expect("serialize"),
            json!({
                "success": false,
                "data": null,
                "message": "Server error",
                "errors": {"message": "Server error"}
            })
        );
    }

    #[test]
    fn test_map_keeps_failure() {
        let response: ApiResponse<i32> = ApiResponse::failure(ApiError::Cancelled);
        let mapped = response.map(|n| n * 2);
        assert_eq!(mapped.error(), Some(&ApiError::Cancelled));
        assert_eq!(mapped.message(), "Request cancelled");

        let ok = ApiResponse::success(2).map(|n| n * 2);
        assert_eq!(ok.into_result(), Ok(4));
    }
}
