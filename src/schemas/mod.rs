//! API schema definitions
//!
//! Request/response types for the public chat API and the wire types
//! for the upstream completion provider.

pub mod chat;
pub mod upstream;
