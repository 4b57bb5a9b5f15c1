//! Application routing
//!
//! This module defines all HTTP routes for the application.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{analyze, chat, generate, health, prompts, run};
use crate::middleware::logging::log_request;
use crate::server::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Health probe routes
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/liveness", get(health::liveness));

    // Workbench API routes
    let api_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route("/run-python", post(run::run_python))
        .route("/analyze-code", post(analyze::analyze_code))
        .route("/generate-error", post(generate::generate_error))
        .route("/prompts", get(prompts::list_prompts))
        .route("/prompts/reload", post(prompts::reload_prompts))
        .route("/prompts/activate", post(prompts::activate_prompt));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(create_cors_layer())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// CORS layer permissive enough for the browser editor during development
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(["x-trace-id".parse().unwrap()])
}
