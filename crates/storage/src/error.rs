/// All errors that can be returned by a RecordStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given internal id or identifier.
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// The identifier is already held by another record. Caused by racing
    /// allocate-then-create calls; callers re-allocate and retry.
    #[error("duplicate identifier: {identifier}")]
    DuplicateIdentifier { identifier: String },

    /// A record with this internal id already exists.
    #[error("record already exists: {id}")]
    AlreadyExists { id: String },

    /// Optimistic concurrency control conflict: the record was saved by
    /// someone else since it was read.
    #[error("concurrent conflict on record {id}: expected version {expected_version}")]
    ConcurrentConflict { id: String, expected_version: i64 },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
