//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.
//!
//! Malformed scheduling configuration is deliberately absent from this enum:
//! it degrades to default scheduling at resolution time (fail-open) and is
//! only ever reported through a `tracing::warn!`.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the Herald broadcaster.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors (bad identifiers, malformed inputs).
    #[error("validation error: {0}")]
    Validation(String),

    /// A decoded payload contained a value whose type is not allow-listed.
    #[error("disallowed type in payload: {0}")]
    DisallowedType(String),

    /// A local structure could not be serialized (e.g. a non-finite float).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// No subscriber or event handler matches the envelope's target.
    #[error("no such handler: {0}")]
    NoSuchHandler(String),

    /// The shared marker store reported a failure.
    #[error("marker store error: {0}")]
    Store(String),

    /// The job queue rejected a submission.
    #[error("queue error: {0}")]
    Queue(String),

    /// The subscriber's event handler raised a failure.
    #[error("handler error: {0}")]
    Handler(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn disallowed_type(msg: impl Into<String>) -> Self {
        Self::DisallowedType(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn no_such_handler(msg: impl Into<String>) -> Self {
        Self::NoSuchHandler(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}
