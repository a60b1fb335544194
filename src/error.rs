//! Common error type and alias for the service.
//!
//! Every failure in the submit/poll/extract pipeline maps to one variant
//! here, and the `IntoResponse` impl is the single place where variants are
//! converted to HTTP statuses and the `{success: false, error}` envelope.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid startup configuration (credentials, endpoint id).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote backend rejected the run request or returned no job id.
    #[error("submission failed: {0}")]
    Submission(String),

    /// The remote job reached FAILED or CANCELLED.
    #[error("remote job failed: {0}")]
    RemoteJobFailed(String),

    /// The status endpoint returned a non-success response.
    #[error("status query failed: {0}")]
    StatusQuery(String),

    /// The poll loop exhausted its attempt budget without a terminal status.
    #[error("timed out waiting for the job to complete; it may still be processing")]
    PollTimeout,

    /// The success payload contained no recognizable image data.
    #[error("could not extract an image from the job output")]
    Extraction,

    /// Caller-supplied input was missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// A workflow template could not be read or parsed.
    #[error("workflow error: {0}")]
    Workflow(String),

    /// The /api/download fetch failed.
    #[error("download failed: {0}")]
    Download(String),

    /// Transport-level failure talking to the remote backend.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_timeout: Option<bool>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PollTimeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let is_timeout = matches!(self, AppError::PollTimeout).then_some(true);
        let envelope = ErrorEnvelope {
            success: false,
            error: self.to_string(),
            is_timeout,
        };
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_504() {
        assert_eq!(AppError::PollTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn bad_request_maps_to_400() {
        assert_eq!(
            AppError::BadRequest("prompt is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn remote_failures_map_to_500() {
        assert_eq!(
            AppError::Submission("nope".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::RemoteJobFailed("oom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
