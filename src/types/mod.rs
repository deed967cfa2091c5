//! Core types for the Herald broadcaster.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (DebounceId, SubscriberId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for queue placement and marker TTL

mod config;
mod errors;
mod ids;

pub use config::{Config, ObservabilityConfig};
pub use errors::{Error, Result};
pub use ids::{DebounceId, SubscriberId};
