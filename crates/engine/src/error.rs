use visaflow_core::ValidationError;
use visaflow_storage::StorageError;

/// Errors returned by the allocator and the workflow tracker.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown category, section or status, or a transition the policy forbids.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The referenced record does not exist.
    #[error("record not found: {id}")]
    NotFound { id: String },

    /// More than 99 identifiers were requested for one category and day.
    #[error("sequence exhausted for {key}: no more than 99 identifiers per day")]
    ExhaustedSequence { key: String },

    /// Creation kept colliding with existing identifiers after all retries.
    #[error("duplicate identifier: {identifier}")]
    DuplicateIdentifier { identifier: String },

    /// Saves kept losing the optimistic concurrency race after all retries.
    #[error("record {id} was modified concurrently; retry the request")]
    Conflict { id: String },

    #[error(transparent)]
    Storage(StorageError),
}

impl EngineError {
    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound { .. } => "not_found",
            EngineError::ExhaustedSequence { .. } => "exhausted_sequence",
            EngineError::DuplicateIdentifier { .. } => "duplicate_identifier",
            EngineError::Conflict { .. } => "conflict",
            EngineError::Storage(_) => "storage",
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RecordNotFound { id } => EngineError::NotFound { id },
            StorageError::DuplicateIdentifier { identifier } => {
                EngineError::DuplicateIdentifier { identifier }
            }
            StorageError::ConcurrentConflict { id, .. } => EngineError::Conflict { id },
            other => EngineError::Storage(other),
        }
    }
}
