//! # VSS Common Library
//!
//! Shared code for the video search pipeline services including:
//! - Domain models (search queries, videos, shim wire types)
//! - Event types (VssEvent enum) and the EventBus
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
