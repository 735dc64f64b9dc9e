//! Receipt composition error model.

use thiserror::Error;

use crate::id::InstanceId;

/// Result type used across the composition engine.
pub type ReceiptResult<T> = Result<T, ReceiptError>;

/// Error raised while composing or submitting a receipt.
///
/// Selection-time variants (`DuplicateSelection`, `InsufficientInventory`,
/// `UnknownInstance`) and submission-time validation (`InvalidRecipient`,
/// `EmptyComposition`) are produced locally and never leave partial state
/// behind. `ConflictOnSubmit` and `TransientFetchError` originate in the
/// external collaborators and are carried verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// The instance is already selected, or bound to another open receipt.
    #[error("instance {0} is already selected or bound to another receipt")]
    DuplicateSelection(InstanceId),

    /// Not enough unused instances left in the pool.
    #[error("insufficient inventory: requested {requested}, only {available} available")]
    InsufficientInventory { requested: usize, available: usize },

    /// No recipient chosen at submit time (or an unknown one).
    #[error("a valid recipient must be selected")]
    InvalidRecipient,

    /// Nothing selected at submit time.
    #[error("receipt has no items")]
    EmptyComposition,

    /// The persistence layer rejected the submission.
    #[error("submission rejected: {0}")]
    ConflictOnSubmit(String),

    /// Catalog, receipt list or recipient directory could not be fetched.
    #[error("fetch failed: {0}")]
    TransientFetchError(String),

    /// The instance is not part of the editable catalog.
    #[error("instance {0} is not in the catalog")]
    UnknownInstance(InstanceId),

    /// The editing session has not loaded yet, or is already closed.
    #[error("editor is not ready")]
    NotReady,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ReceiptError {
    pub fn insufficient(requested: usize, available: usize) -> Self {
        Self::InsufficientInventory {
            requested,
            available,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConflictOnSubmit(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::TransientFetchError(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Whether the error was raised locally, before any provider call.
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            Self::ConflictOnSubmit(_) | Self::TransientFetchError(_)
        )
    }
}
