//! Prompt store endpoints
//!
//! Explicit operations on the versioned system-prompt store: list,
//! reload from disk, and switch the active version.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::prompt::{PromptConfig, BUILTIN_VERSION};
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct PromptListResponse {
    pub active: PromptSummary,
    pub versions: Vec<String>,
}

#[derive(Serialize)]
pub struct PromptSummary {
    pub version: String,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

impl From<&PromptConfig> for PromptSummary {
    fn from(config: &PromptConfig) -> Self {
        Self {
            version: config.version.clone(),
            loaded_at: config.loaded_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub version: Option<String>,
}

/// GET /api/prompts - List prompt versions and the active one.
pub async fn list_prompts(
    State(state): State<AppState>,
) -> Result<Json<PromptListResponse>, ApiError> {
    let versions = state.prompts.list()?;
    let active = state.prompts.active();

    Ok(Json(PromptListResponse {
        active: PromptSummary::from(active.as_ref()),
        versions,
    }))
}

/// POST /api/prompts/reload - Re-read the active prompt from disk.
pub async fn reload_prompts(
    State(state): State<AppState>,
) -> Result<Json<PromptSummary>, ApiError> {
    let config = state.prompts.reload()?;
    Ok(Json(PromptSummary::from(config.as_ref())))
}

/// POST /api/prompts/activate - Switch the active prompt version.
pub async fn activate_prompt(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<PromptSummary>, ApiError> {
    let version = request
        .version
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Missing required field: version".to_string()))?;

    if version != BUILTIN_VERSION && !state.prompts.list()?.iter().any(|v| v == version) {
        return Err(ApiError::NotFound(format!(
            "Unknown prompt version: {}",
            version
        )));
    }

    let config = state.prompts.activate(version)?;

    Ok(Json(PromptSummary::from(config.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use axum::extract::State;

    #[tokio::test]
    async fn list_shows_builtin_without_prompt_dir() {
        let state = AppState::new(Settings::default()).await.unwrap();
        let Json(response) = list_prompts(State(state)).await.unwrap();

        assert_eq!(response.active.version, BUILTIN_VERSION);
        assert_eq!(response.versions, vec![BUILTIN_VERSION.to_string()]);
    }

    #[tokio::test]
    async fn activating_unknown_version_is_not_found() {
        let state = AppState::new(Settings::default()).await.unwrap();
        let err = activate_prompt(
            State(state),
            Json(ActivateRequest {
                version: Some("v99".to_string()),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn activating_without_version_is_invalid() {
        let state = AppState::new(Settings::default()).await.unwrap();
        let err = activate_prompt(State(state), Json(ActivateRequest { version: None }))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }
}
