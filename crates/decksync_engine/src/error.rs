//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// None of these escape the orchestrator: [`crate::SyncEngine::sync`] folds
/// them into a structured pass outcome.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote backend or network error on a batch.
    #[error("remote error: {message}")]
    Remote {
        /// Error message.
        message: String,
        /// Whether the operation can be retried on a later pass.
        retryable: bool,
    },

    /// Local store error.
    #[error("local store error: {0}")]
    Store(String),

    /// Data-model error.
    #[error("core error: {0}")]
    Core(#[from] decksync_core::CoreError),

    /// No authenticated session is available.
    #[error("no authenticated session")]
    NoSession,

    /// The authenticated session does not match the requested owner.
    ///
    /// Fatal: the pass fails and is not retried without re-authentication.
    #[error("authenticated session {authenticated} does not match owner {requested}")]
    IdentityMismatch {
        /// The owner the pass was invoked for.
        requested: String,
        /// The identity the session actually carries.
        authenticated: String,
    },
}

impl SyncError {
    /// Creates a retryable remote error.
    pub fn remote_retryable(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable remote error.
    pub fn remote_fatal(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a local store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Returns true if a later pass may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote { retryable, .. } => *retryable,
            SyncError::Store(_) => true,
            SyncError::Core(_) => false,
            SyncError::NoSession => false,
            SyncError::IdentityMismatch { .. } => false,
        }
    }
}
