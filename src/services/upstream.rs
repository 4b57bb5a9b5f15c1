//! Upstream completion provider client
//!
//! Speaks the OpenAI-compatible chat-completions REST API over reqwest,
//! in both non-streaming and streaming (SSE) modes. The streaming side
//! is pull-based: callers drain [`CompletionStream::recv`] and forward
//! each delta as it arrives.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::config::UpstreamSettings;
use crate::schemas::chat::ChatMessage;
use crate::schemas::upstream::{
    CompletionRequest, CompletionResponse, StreamChunk, UpstreamErrorBody,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the upstream provider
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Upstream API key is not configured")]
    MissingApiKey,

    #[error("Provider returned an empty completion")]
    EmptyCompletion,

    #[error("Stream error: {0}")]
    Stream(String),
}

// ============================================================================
// Per-call options
// ============================================================================

/// Sampling options for a single provider call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

// ============================================================================
// Upstream Service
// ============================================================================

/// Client for the configured completion provider.
pub struct UpstreamService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl UpstreamService {
    /// Create a client from settings.
    ///
    /// Only the connect timeout is applied globally: a whole-request
    /// timeout would cut long-lived streaming responses short, so the
    /// non-streaming path applies its own per-request timeout instead.
    pub fn new(settings: &UpstreamSettings) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            request_timeout: Duration::from_secs(settings.timeout_seconds),
        })
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or(UpstreamError::MissingApiKey)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
        stream: bool,
    ) -> CompletionRequest {
        CompletionRequest {
            model: options.model.clone().unwrap_or_else(|| self.model.clone()),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream,
        }
    }

    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// The default model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single non-streaming completion, returning the assistant text.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String, UpstreamError> {
        let api_key = self.api_key()?.to_string();
        let request = self.build_request(messages, options, false);

        tracing::debug!(
            model = %request.model,
            message_count = request.messages.len(),
            "Calling upstream completion API"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        let body = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse upstream completion response");
            UpstreamError::Parse(e.to_string())
        })?;

        parsed
            .first_text()
            .map(|t| t.to_string())
            .ok_or(UpstreamError::EmptyCompletion)
    }

    /// Open a streaming completion.
    ///
    /// Returns as soon as response headers arrive; a non-2xx status is
    /// surfaced here as a single error, before any chunk exists.
    pub async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<CompletionStream, UpstreamError> {
        let api_key = self.api_key()?.to_string();
        let request = self.build_request(messages, options, true);

        tracing::debug!(
            model = %request.model,
            message_count = request.messages.len(),
            "Calling upstream completion API (streaming)"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        Ok(CompletionStream::new(response))
    }
}

fn api_error(status: u16, body: String) -> UpstreamError {
    // Prefer the provider's own error message when the body carries one.
    if let Ok(parsed) = serde_json::from_str::<UpstreamErrorBody>(&body) {
        return UpstreamError::Api {
            status,
            message: parsed.error.message,
        };
    }
    UpstreamError::Api {
        status,
        message: body,
    }
}

// ============================================================================
// Streaming Support
// ============================================================================

/// One logical event on a completion stream.
#[derive(Debug)]
pub enum StreamEvent {
    /// An incremental fragment of assistant text.
    Delta(String),
    /// The provider's explicit end-of-stream marker.
    Done,
}

/// A pull-based stream of completion deltas.
///
/// `recv` yields events in arrival order; `Ok(None)` means the
/// transport closed without a `[DONE]` marker, which callers must treat
/// as a partial result rather than a failure of delivered fragments.
pub struct CompletionStream {
    response: reqwest::Response,
    buffer: SseBuffer,
    done: bool,
}

impl CompletionStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: SseBuffer::new(),
            done: false,
        }
    }

    /// Receive the next event from the stream.
    pub async fn recv(&mut self) -> Result<Option<StreamEvent>, UpstreamError> {
        if self.done {
            return Ok(None);
        }

        loop {
            // Drain parsed records before touching the network again.
            while let Some(data) = self.buffer.next_record() {
                if data == "[DONE]" {
                    self.done = true;
                    return Ok(Some(StreamEvent::Done));
                }

                match serde_json::from_str::<StreamChunk>(&data) {
                    Ok(chunk) => {
                        if let Some(text) = chunk.delta_text() {
                            if !text.is_empty() {
                                return Ok(Some(StreamEvent::Delta(text.to_string())));
                            }
                        }
                        // Role-only or finish_reason-only chunks carry no text.
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, data = %data, "Skipping unparseable stream record");
                    }
                }
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => self.buffer.push(&bytes),
                Ok(None) => return Ok(None),
                Err(e) => return Err(UpstreamError::Stream(e.to_string())),
            }
        }
    }
}

/// Buffered splitter for `data: …\n\n` SSE records.
///
/// Transport reads may end anywhere, including inside a record or in
/// the middle of a multi-byte UTF-8 sequence, so the buffer holds raw
/// bytes and splits on the byte-level delimiter; only complete records
/// are decoded. Records without a `data:` field are dropped.
#[derive(Debug, Default)]
pub struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw transport bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete record's data payload, if one is buffered.
    pub fn next_record(&mut self) -> Option<String> {
        loop {
            let end = self.pending.windows(2).position(|w| w == b"\n\n")?;
            let record = self.pending[..end].to_vec();
            self.pending.drain(..end + 2);

            // Decoding waits for the full record, so a codepoint split
            // across reads is never decoded half-finished. Invalid UTF-8
            // within a complete record is replaced, not fatal.
            let record = String::from_utf8_lossy(&record);

            // An SSE record may carry several lines (event:, id:, …);
            // only data lines matter here.
            let data: Vec<&str> = record
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .collect();

            if data.is_empty() {
                continue;
            }

            return Some(data.join("\n"));
        }
    }
}
