//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::analysis::AnalysisError;
use crate::services::error_examples::ErrorExampleError;
use crate::services::executor::ExecError;
use crate::services::upstream::UpstreamError;

/// Request-scoped API errors.
///
/// Subprocess stderr is deliberately NOT represented here: a run whose
/// stderr is non-empty is still a 200 response carrying `{error: …}` as
/// its primary result.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<ExecError> for ApiError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::EmptySource => ApiError::InvalidRequest("No code provided".to_string()),
            ExecError::SandboxUnavailable(msg) => ApiError::ExecutorUnavailable(msg),
            other => ApiError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Exec(e) => e.into(),
            AnalysisError::Upstream(e) => e.into(),
        }
    }
}

impl From<ErrorExampleError> for ApiError {
    fn from(err: ErrorExampleError) -> Self {
        match err {
            ErrorExampleError::Upstream(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::ExecutorUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Flat error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn invalid_request_is_400() {
        let response = ApiError::InvalidRequest("No code provided".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_is_502() {
        let response = ApiError::Upstream("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn empty_source_maps_to_invalid_request() {
        let err: ApiError = ExecError::EmptySource.into();
        assert!(matches!(err, ApiError::InvalidRequest(msg) if msg == "No code provided"));
    }
}
