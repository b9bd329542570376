//! Error types for the tracecast environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Fetching or decoding an asset failed
    #[error("Asset load failed: {0}")]
    AssetLoadFailed(String),

    /// The requested model does not exist
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates an asset load error.
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoadFailed(msg.into())
    }

    /// Creates a not-found error for a model name.
    pub fn not_found(model: impl std::fmt::Display) -> Self {
        Self::AssetNotFound(model.to_string())
    }
}
