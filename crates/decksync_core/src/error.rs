//! Error types for decksync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core data-model operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Content could not be serialized for hashing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted to mutate a record owned by the shared sentinel owner.
    ///
    /// Shared seed content is read-only on every client.
    #[error("record {id} is shared seed content and cannot be modified")]
    SharedOwnerMutation {
        /// The record that was targeted.
        id: String,
    },
}
