#![forbid(unsafe_code)]

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pm_core::dates::DateParseError;
use pm_core::model::ParseEnumError;
use pm_storage::StoreError;
use serde_json::{Value, json};
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    Conflict,
    InternalError,
}

impl ApiErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorCode::BadRequest => "BAD_REQUEST",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::Forbidden => "FORBIDDEN",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::ValidationError => "VALIDATION_ERROR",
            ApiErrorCode::Conflict => "CONFLICT",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest | ApiErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire error: `{code, message, details}` with the status implied by `code`.
#[derive(Clone, Debug)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message)
    }

    /// Logs `detail` and hides it from the caller.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "internal error");
        Self::new(ApiErrorCode::InternalError, "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.code.as_str(),
            "message": self.message,
            "details": self.details,
        });
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StoreError::Forbidden(msg) => ApiError::new(ApiErrorCode::Forbidden, msg),
            StoreError::Validation(msg) | StoreError::InvalidArgument(msg) => {
                ApiError::validation(msg)
            }
            StoreError::Conflict(msg) => ApiError::new(ApiErrorCode::Conflict, msg),
            err @ (StoreError::Sql(_) | StoreError::Io(_)) => ApiError::internal(err),
        }
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        ApiError::validation(err.to_string())
            .with_details(json!({ "field": err.field, "value": err.value }))
    }
}

impl From<DateParseError> for ApiError {
    fn from(err: DateParseError) -> Self {
        ApiError::validation(err.to_string())
            .with_details(json!({ "field": err.field, "value": err.value }))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_fixed_codes() {
        let cases = [
            (StoreError::not_found("work item 7"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (StoreError::forbidden("archived"), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (StoreError::validation("bad window"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                StoreError::InvalidArgument("prefix".to_string()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (StoreError::Conflict("dup".to_string()), StatusCode::CONFLICT, "CONFLICT"),
        ];
        for (store_err, status, code) in cases {
            let api: ApiError = store_err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.code.as_str(), code);
        }
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let io = std::io::Error::other("disk on fire");
        let api: ApiError = StoreError::Io(io).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("disk"));
    }
}
