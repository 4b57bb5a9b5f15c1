//! Chat relay endpoint
//!
//! POST /api/chat: forwards a conversation to the upstream provider in
//! streaming mode and re-emits each fragment to the caller as an SSE
//! record `data: {"delta": …}` the moment it arrives, closing with
//! `data: [DONE]`. Nothing is buffered beyond record framing, so the
//! first byte reaches the browser long before the completion finishes.

use axum::{
    extract::State,
    response::{sse::Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schemas::chat::{ChatMessage, ChatRequest, DeltaEvent, Role, StreamErrorEvent};
use crate::server::state::AppState;
use crate::services::{CompletionOptions, StreamEvent};

/// Generation bound applied when the caller sends none.
const DEFAULT_CHAT_MAX_TOKENS: u32 = 1500;

/// POST /api/chat - Relay a conversation to the provider, streaming.
pub async fn chat(
    State(state): State<AppState>,
    axum::Json(request): axum::Json<ChatRequest>,
) -> Result<Sse<std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>, ApiError>
{
    let request_id = Uuid::new_v4().to_string();

    let messages = validate_conversation(&state, request.messages)?;

    let options = CompletionOptions {
        model: request.model,
        temperature: request.temperature,
        max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_CHAT_MAX_TOKENS)),
    };

    tracing::info!(
        request_id = %request_id,
        message_count = messages.len(),
        max_tokens = options.max_tokens,
        "Processing chat relay request"
    );

    // A failure here happens before any chunk exists and is a plain
    // JSON error response, not a stream.
    let mut upstream = state.upstream.stream(messages, &options).await?;

    let stream = async_stream::stream! {
        loop {
            match upstream.recv().await {
                Ok(Some(StreamEvent::Delta(delta))) => {
                    let payload = serde_json::to_string(&DeltaEvent { delta })
                        .unwrap_or_default();
                    yield Ok(Event::default().data(payload));
                }
                Ok(Some(StreamEvent::Done)) => {
                    tracing::debug!(request_id = %request_id, "Upstream signaled completion");
                    yield Ok(Event::default().data("[DONE]"));
                    break;
                }
                Ok(None) => {
                    // Transport closed without [DONE]: the caller sees the
                    // missing terminal marker and treats the transcript as
                    // partial.
                    tracing::warn!(request_id = %request_id, "Upstream closed without DONE marker");
                    break;
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Stream error");
                    let payload = serde_json::to_string(&StreamErrorEvent {
                        error: e.to_string(),
                    })
                    .unwrap_or_default();
                    yield Ok(Event::default().data(payload));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(Box::pin(stream)))
}

/// Enforce the conversation invariants and inject the active system
/// prompt when the caller did not bring one.
fn validate_conversation(
    state: &AppState,
    messages: Vec<ChatMessage>,
) -> Result<Vec<ChatMessage>, ApiError> {
    if messages.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Conversation must not be empty".to_string(),
        ));
    }

    let ends_with_user = messages
        .last()
        .map(|m| m.role == Role::User)
        .unwrap_or(false);
    if !ends_with_user {
        return Err(ApiError::InvalidRequest(
            "Conversation must end with a user message".to_string(),
        ));
    }

    let has_system = messages.iter().any(|m| m.role == Role::System);
    if has_system {
        return Ok(messages);
    }

    let prompt = state.prompts.active();
    let mut with_system = Vec::with_capacity(messages.len() + 1);
    with_system.push(ChatMessage::system(prompt.content.clone()));
    with_system.extend(messages);
    Ok(with_system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    async fn test_state() -> AppState {
        let mut settings = Settings::default();
        settings.upstream.api_key = Some("test-key".to_string());
        AppState::new(settings).await.unwrap()
    }

    #[tokio::test]
    async fn empty_conversation_is_rejected() {
        let state = test_state().await;
        let err = validate_conversation(&state, vec![]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn conversation_must_end_with_user_message() {
        let state = test_state().await;
        let err = validate_conversation(
            &state,
            vec![
                ChatMessage::user("hello"),
                ChatMessage::assistant("hi there"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn active_prompt_is_injected_when_absent() {
        let state = test_state().await;
        let messages = validate_conversation(&state, vec![ChatMessage::user("hello")]).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn caller_system_prompt_is_left_alone() {
        let state = test_state().await;
        let messages = validate_conversation(
            &state,
            vec![
                ChatMessage::system("my own prompt"),
                ChatMessage::user("hello"),
            ],
        )
        .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "my own prompt");
    }
}
