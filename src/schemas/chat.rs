//! Public chat API schema definitions
//!
//! Types for the POST /api/chat endpoint: a role-tagged conversation in,
//! a stream of delta records out.

use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message.
///
/// Messages are immutable once sent; insertion order is turn order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat relay request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Ordered conversation; must be non-empty and end with a user message.
    pub messages: Vec<ChatMessage>,

    /// Model override (defaults to the configured upstream model)
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
}

/// One relayed SSE record payload: `data: {"delta": "..."}`
#[derive(Debug, Clone, Serialize)]
pub struct DeltaEvent {
    pub delta: String,
}

/// Mid-stream failure payload, sent in place of a delta record.
#[derive(Debug, Clone, Serialize)]
pub struct StreamErrorEvent {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }

    #[test]
    fn chat_request_deserializes_with_optional_fields() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages": [{"role": "user", "content": "why is my loop infinite?"}]}"#,
        )
        .unwrap();

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
        assert!(request.model.is_none());
        assert!(request.max_tokens.is_none());
    }

    #[test]
    fn delta_event_shape() {
        let json = serde_json::to_string(&DeltaEvent {
            delta: "par".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"delta":"par"}"#);
    }
}
