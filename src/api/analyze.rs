//! Code analysis endpoint
//!
//! POST /api/analyze-code: execute the submitted source to completion,
//! then ask the provider to explain the run.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(rename = "runtimeError")]
    pub runtime_error: Option<String>,
    pub output: Option<String>,
    pub analysis: String,
}

/// POST /api/analyze-code - Run code, then explain the result.
pub async fn analyze_code(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let code = request
        .code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("No code provided".to_string()))?;

    let report = state.analysis.analyze(code).await?;

    tracing::info!(
        failed = report.runtime_error.is_some(),
        analysis_chars = report.analysis.len(),
        "Analysis completed"
    );

    Ok(Json(AnalyzeResponse {
        runtime_error: report.runtime_error,
        output: report.output,
        analysis: report.analysis,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case_runtime_error() {
        let json = serde_json::to_string(&AnalyzeResponse {
            runtime_error: Some("ZeroDivisionError".to_string()),
            output: None,
            analysis: "The divisor was zero.".to_string(),
        })
        .unwrap();

        assert!(json.contains("\"runtimeError\":\"ZeroDivisionError\""));
        assert!(json.contains("\"output\":null"));
    }
}
