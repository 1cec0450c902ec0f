// src/handlers/error.rs
use serde_json::json;
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::reply::{Json, WithStatus};

use crate::services::calculator::InflationError;
use crate::services::exports::ExportError;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn data_unavailable() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "DATA_UNAVAILABLE", "Unable to load CPI data")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "Method not allowed")
    }

    /// `{ "success": false, "error": { "code", "message" } }` with this error's status.
    pub fn to_reply(&self) -> WithStatus<Json> {
        warp::reply::with_status(
            warp::reply::json(&json!({
                "success": false,
                "error": {
                    "code": self.code,
                    "message": self.message,
                },
            })),
            self.status,
        )
    }
}

impl From<InflationError> for ApiError {
    fn from(err: InflationError) -> Self {
        ApiError::bad_request(err.code.as_str(), err.message)
    }
}

impl From<&ExportError> for ApiError {
    fn from(err: &ExportError) -> Self {
        match err {
            ExportError::NotFound { slug } => ApiError::new(
                StatusCode::NOT_FOUND,
                "EXPORT_NOT_FOUND",
                format!("No export available for '{}'", slug),
            ),
            ExportError::TooLarge { .. } => ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "EXPORT_TOO_LARGE",
                "Export exceeds the allowed size",
            ),
            ExportError::InvalidSlug(_) => ApiError::bad_request("INVALID_SLUG", err.to_string()),
            _ => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "DATASET_UNAVAILABLE", "Dataset unavailable"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}
