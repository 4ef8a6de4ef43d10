//! Error types and result aliases for stowage.
//!
//! Errors are structured for programmatic handling: per-object failures
//! carry the key involved, storage failures carry the operation that
//! exhausted its retry budget and the underlying cause.

/// The result type used throughout stowage.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stowage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A storage call could not complete within its retry budget.
    ///
    /// Aborts the affected category's pipeline; other categories are
    /// unaffected.
    #[error("storage unavailable during {operation}: {message}")]
    StorageUnavailable {
        /// The storage operation that failed (e.g. "list", "copy").
        operation: &'static str,
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A copied object could not be confirmed at its destination.
    ///
    /// The source object is left in place and retried on the next
    /// invocation.
    #[error("copy verification failed: {key} -> {destination}")]
    CopyVerificationFailed {
        /// Source key that was copied.
        key: String,
        /// Destination key that could not be confirmed.
        destination: String,
    },

    /// A source object could not be deleted after a successful copy.
    ///
    /// Source and destination both exist afterwards; the duplicate is
    /// reconciled by the next invocation.
    #[error("delete failed for {key}: {message}")]
    DeleteFailed {
        /// Key that could not be deleted.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// A retention policy failed validation.
    #[error("invalid policy for category {category}: {message}")]
    InvalidPolicy {
        /// The category whose policy was rejected.
        category: String,
        /// What made the policy invalid.
        message: String,
    },

    /// A path or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a storage-unavailable error with the given operation and message.
    #[must_use]
    pub fn storage_unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a storage-unavailable error with a source cause.
    #[must_use]
    pub fn storage_unavailable_with_source(
        operation: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageUnavailable {
            operation,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid-policy error for the given category.
    #[must_use]
    pub fn invalid_policy(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            category: category.into(),
            message: message.into(),
        }
    }
}
