//! API error types module

pub mod types;

pub use types::ApiError;
