//! Request logging middleware
//!
//! Correlates every request and response under a trace ID, taken from
//! the caller's `x-trace-id` header when present.

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Header name for trace ID
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Trace ID carried through request extensions
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Log each request and its response status/duration under a trace ID.
pub async fn log_request(request: Request, next: Next) -> Response<Body> {
    let start = Instant::now();

    let trace_id = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| TraceId(s.to_string()))
        .unwrap_or_default();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::info!(
        trace_id = %trace_id,
        method = %method,
        path = %path,
        "Incoming request"
    );

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    let mut response = {
        let _guard = span.enter();
        next.run(request).await
    };

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            trace_id = %trace_id,
            status = %status.as_u16(),
            duration_ms = %format!("{:.2}", duration_ms),
            "Server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            trace_id = %trace_id,
            status = %status.as_u16(),
            duration_ms = %format!("{:.2}", duration_ms),
            "Client error"
        );
    } else {
        tracing::info!(
            trace_id = %trace_id,
            status = %status.as_u16(),
            duration_ms = %format!("{:.2}", duration_ms),
            "Request completed"
        );
    }

    if let Ok(header_value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, header_value);
    }

    response
}
