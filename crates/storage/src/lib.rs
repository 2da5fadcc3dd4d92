//! visaflow-storage: the record store seam.
//!
//! The allocator and the workflow tracker only talk to storage through
//! [`RecordStore`]. [`MemoryStore`] is the bundled backend; other backends
//! prove themselves against [`conformance::run_conformance_suite`].

pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::{NewRecord, Party, RecordFilter, TransitionRecord, WorkflowRecord};
pub use traits::RecordStore;

/// Current time as an RFC 3339 string, the timestamp format of every record.
pub fn now_rfc3339() -> Result<String, StorageError> {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|e| StorageError::Backend(format!("timestamp formatting failed: {e}")))
}
