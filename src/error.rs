//! Error types for shadow-search.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShadowError>;

/// Errors raised while building catalogs, loading configuration or
/// rewriting updates.
///
/// Detection and tokenization never fail: ambiguity resolves to "touched"
/// and non-string values tokenize to the empty string.
#[derive(Debug, Error)]
pub enum ShadowError {
    /// The schema description is malformed (unknown type tag, cyclic
    /// reference, duplicate names, ...). No catalog is produced.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Configuration could not be validated.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller handed over a value of the wrong shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The update cannot be expressed as a pipeline.
    #[error("unsupported update: {0}")]
    UnsupportedUpdate(String),

    /// An external normalizer failed.
    #[error("update normalizer failed: {0}")]
    Normalizer(#[from] anyhow::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShadowError {
    pub fn schema(msg: impl Into<String>) -> Self {
        ShadowError::Schema(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        ShadowError::InvalidConfig(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ShadowError::InvalidArgument(msg.into())
    }

    pub fn unsupported_update(msg: impl Into<String>) -> Self {
        ShadowError::UnsupportedUpdate(msg.into())
    }
}
