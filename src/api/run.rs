//! Code execution endpoint
//!
//! POST /api/run-python: run the submitted source in the sandbox and
//! return the single combined result once the process has exited. No
//! token-level streaming on this path.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::state::AppState;
use crate::services::ExecOutcome;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub code: Option<String>,
}

/// Exactly one of the two shapes is returned: a clean run carries
/// `{output}`, anything on stderr carries `{error}` instead.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunResponse {
    Output { output: String },
    Failure { error: String },
}

/// POST /api/run-python - Execute submitted code in the sandbox.
pub async fn run_python(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let code = request
        .code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("No code provided".to_string()))?;

    let result = state.executor.execute(code).await?;

    tracing::info!(
        exit_code = result.exit_code,
        timed_out = result.timed_out,
        failed = !result.stderr.is_empty(),
        stdout_truncated = result.stdout_truncated,
        "Execution finished"
    );

    let response = match result.outcome() {
        ExecOutcome::Output(output) => RunResponse::Output { output },
        ExecOutcome::Failure(error) => RunResponse::Failure { error },
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_response_serializes_single_field() {
        let json = serde_json::to_string(&RunResponse::Output {
            output: "fib(10) = 55\n".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"output":"fib(10) = 55\n"}"#);
    }

    #[test]
    fn failure_response_serializes_single_field() {
        let json = serde_json::to_string(&RunResponse::Failure {
            error: "SyntaxError: invalid syntax".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"SyntaxError: invalid syntax"}"#);
    }

    #[test]
    fn missing_code_deserializes_as_none() {
        let request: RunRequest = serde_json::from_str("{}").unwrap();
        assert!(request.code.is_none());
    }
}
