//! Health check endpoints
//!
//! Health, readiness, and liveness probes for monitoring and container
//! orchestration.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::state::AppState;

/// Response for the main health check endpoint
#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: u64,
    pub prompt: PromptMetadata,
}

/// Active-prompt metadata surfaced on /health
#[derive(Serialize)]
pub struct PromptMetadata {
    pub version: String,
    pub loaded_at: DateTime<Utc>,
}

/// Response for readiness probe
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub config_loaded: bool,
    pub upstream_configured: bool,
    pub executor_isolation: String,
    pub executor_backend: String,
}

/// Response for liveness probe
#[derive(Serialize)]
pub struct LivenessResponse {
    pub alive: bool,
}

/// Main health check endpoint
///
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let prompt = state.prompts.active();

    Json(HealthResponse {
        ok: true,
        version: state.settings.app_version.clone(),
        environment: state.settings.environment.to_string(),
        uptime_seconds: state.uptime_seconds(),
        prompt: PromptMetadata {
            version: prompt.version.clone(),
            loaded_at: prompt.loaded_at,
        },
    })
}

/// Readiness probe endpoint
///
/// An unconfigured upstream key is reported but does not fail
/// readiness: the executor endpoints still work without it.
///
/// GET /ready
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let checks = ReadinessChecks {
        config_loaded: true,
        upstream_configured: state.upstream.is_configured(),
        executor_isolation: state.executor.isolation().to_string(),
        executor_backend: state.executor.backend_info().await,
    };

    let ready = checks.config_loaded;

    if !checks.upstream_configured {
        tracing::debug!(
            checks = ?checks,
            "Upstream API key not configured (chat endpoints will fail)"
        );
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}

/// Liveness probe endpoint
///
/// GET /liveness
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { alive: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[tokio::test]
    async fn health_reports_ok_with_prompt_metadata() {
        let state = AppState::new(Settings::default()).await.unwrap();
        let Json(response) = health_check(axum::extract::State(state)).await;

        assert!(response.ok);
        assert_eq!(response.prompt.version, crate::prompt::BUILTIN_VERSION);
    }

    #[tokio::test]
    async fn readiness_reports_missing_upstream_key() {
        let state = AppState::new(Settings::default()).await.unwrap();
        let (status, Json(response)) = readiness(axum::extract::State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(response.ready);
        assert!(!response.checks.upstream_configured);
        assert_eq!(response.checks.executor_isolation, "process");
        assert!(response.checks.executor_backend.starts_with("process"));
    }

    #[tokio::test]
    async fn liveness_is_alive() {
        let Json(response) = liveness().await;
        assert!(response.alive);
    }
}
