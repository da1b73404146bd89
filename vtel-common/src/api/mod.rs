//! API module for shared HTTP API functionality
//!
//! Provides the request method type, response envelope and error type used
//! by the dispatcher and by every caller of the backend REST API.
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP client dependencies)
//! - Shared types
//!
//! The transport (reqwest) and the dispatcher live in `vtel-client`.

pub mod error;
pub mod types;

pub use error::ApiError;
pub use types::{normalize_payload, ApiEnvelope, HttpMethod};
