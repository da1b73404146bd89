//! # VTEL Common Library
//!
//! Shared code for the VTEL dashboard API client including:
//! - Endpoint registry (logical resource name → URL path)
//! - API response envelope and error types
//! - Configuration loading (TOML bootstrap, environment, defaults)
//! - Session token resolution

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;

pub use error::{Error, Result};
