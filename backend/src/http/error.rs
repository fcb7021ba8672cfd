//! HTTP error handling and response types.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::export::ExportError;
use crate::upstream::UpstreamError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Raw upstream error or other diagnostic detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed request parameter
    BadRequest(String),
    /// Resource not found
    NotFound(String),
    /// Request conflicts with the resource state (e.g. export while running)
    Conflict(String),
    /// Internal server error
    Internal(String),
    /// Upstream service error
    Upstream(UpstreamError),
    /// Workbook export error
    Export(ExportError),
}

impl AppError {
    pub fn missing_param(name: &str) -> Self {
        AppError::BadRequest(format!("Missing required parameter '{}'", name))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Upstream(err) => upstream_response(&err),
            AppError::Export(ExportError::NoData) => (
                StatusCode::NOT_FOUND,
                ApiError::new("NO_DATA", ExportError::NoData.to_string()),
            ),
            AppError::Export(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("EXPORT_ERROR", "Failed to generate the spreadsheet")
                    .with_detail(err.to_string()),
            ),
        };

        (status, Json(error)).into_response()
    }
}

/// Relay the upstream status when there is one, else 500.
fn upstream_response(err: &UpstreamError) -> (StatusCode, ApiError) {
    let service = err
        .service()
        .map(|s| s.label())
        .unwrap_or("upstream service");
    let status = err
        .status_code()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let (code, message) = if status == StatusCode::NOT_FOUND {
        ("NOT_FOUND", format!("Resource not found at {}", service))
    } else {
        ("UPSTREAM_ERROR", format!("Error contacting {}", service))
    };
    (status, ApiError::new(code, message).with_detail(err.to_string()))
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::Upstream(err)
    }
}

/// Malformed JSON bodies answer 400 with the envelope instead of axum's plain-text 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Export(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::Service;

    #[test]
    fn test_upstream_status_is_relayed() {
        let (status, body) =
            upstream_response(&UpstreamError::status(Service::Wtss, 429, "Too Many Requests"));
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.code, "UPSTREAM_ERROR");
        assert!(body.message.contains("BDC WTSS"));
        assert!(body.detail.unwrap().contains("Too Many Requests"));
    }

    #[test]
    fn test_upstream_not_found() {
        let (status, body) = upstream_response(&UpstreamError::status(Service::Wtss, 404, "nope"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[test]
    fn test_transport_error_is_500() {
        let err = UpstreamError::Transport {
            service: Service::Stac,
            message: "connection refused".into(),
            timeout: false,
        };
        let (status, body) = upstream_response(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.detail.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_odd_upstream_status_falls_back_to_500() {
        let (status, _) = upstream_response(&UpstreamError::status(Service::Stac, 302, ""));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_param_message() {
        let response = AppError::missing_param("latitude").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
