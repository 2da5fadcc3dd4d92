use async_trait::async_trait;
use visaflow_core::{Identifier, SequenceKey};

use crate::error::StorageError;
use crate::record::{RecordFilter, TransitionRecord, WorkflowRecord};

/// The storage trait for visaflow backends.
///
/// A `RecordStore` holds workflow records as whole documents plus two pieces
/// of bookkeeping: the per-day identifier counters and the transition audit
/// trail.
///
/// ## Sequence reservation
///
/// `reserve_sequence` is an atomic increment-and-get on the counter for one
/// `(category, dateStamp)` key. The counter never falls behind the greatest
/// identifier already stored under the key's prefix, so records written
/// before the counter existed are respected.
///
/// ## OCC Conflict Detection
///
/// `save` performs an optimistic concurrency check: the stored version must
/// equal `record.version`. Otherwise the method returns
/// `Err(StorageError::ConcurrentConflict { ... })` and nothing is written.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // ── Identifier bookkeeping ──────────────────────────────────────────────

    /// The lexicographically greatest identifier starting with `prefix`.
    async fn find_latest_by_prefix(&self, prefix: &str)
        -> Result<Option<Identifier>, StorageError>;

    /// Atomically advance the counter for `key` and return the new value.
    ///
    /// The first reservation of a day returns 1 (or one past the greatest
    /// stored sequence). Values past 99 are returned as-is; rejecting them
    /// is the caller's decision.
    async fn reserve_sequence(&self, key: SequenceKey) -> Result<u32, StorageError>;

    // ── Record operations ────────────────────────────────────────────────────

    /// Insert a new record.
    ///
    /// Returns `Err(StorageError::DuplicateIdentifier)` if another record
    /// already holds the identifier, `Err(StorageError::AlreadyExists)` if
    /// the internal id is taken.
    async fn create_record(&self, record: WorkflowRecord) -> Result<WorkflowRecord, StorageError>;

    /// Read a record by internal id.
    ///
    /// Returns `Err(StorageError::RecordNotFound)` if it does not exist.
    async fn find_by_id(&self, id: &str) -> Result<WorkflowRecord, StorageError>;

    /// Read a record by its external identifier.
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<WorkflowRecord, StorageError>;

    /// Replace a record (single-document update), version-checked.
    ///
    /// The identifier and creation time of the stored record are kept. On
    /// success the returned record carries the incremented version and a
    /// fresh `updated_at`.
    async fn save(&self, record: WorkflowRecord) -> Result<WorkflowRecord, StorageError>;

    /// List records matching `filter`, ordered by `created_at` then id.
    async fn list_records(&self, filter: &RecordFilter)
        -> Result<Vec<WorkflowRecord>, StorageError>;

    // ── Audit trail ──────────────────────────────────────────────────────────

    /// Append a transition record.
    async fn insert_transition(&self, record: TransitionRecord) -> Result<(), StorageError>;

    /// All transitions of one record, oldest first. Empty if none.
    async fn list_transitions(&self, record_id: &str)
        -> Result<Vec<TransitionRecord>, StorageError>;
}
