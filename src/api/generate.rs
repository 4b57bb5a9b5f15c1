//! Error-example generation endpoint
//!
//! POST /api/generate-error: ask the provider for one buggy practice
//! snippet of the requested difficulty and category.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::state::AppState;
use crate::services::ErrorExample;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub level: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
}

/// POST /api/generate-error - Generate one practice example.
pub async fn generate_error(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<ErrorExample>, ApiError> {
    let level = request
        .level
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Missing required field: level".to_string()))?;
    let category = request
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Missing required field: type".to_string()))?;

    tracing::info!(level = %level, category = %category, "Generating practice example");

    let example = state.error_examples.generate(level, category).await?;

    Ok(Json(example))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_type_field_to_category() {
        let request: GenerateRequest =
            serde_json::from_str(r#"{"level": "beginner", "type": "syntax"}"#).unwrap();

        assert_eq!(request.level.as_deref(), Some("beginner"));
        assert_eq!(request.category.as_deref(), Some("syntax"));
    }
}
