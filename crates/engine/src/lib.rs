//! visaflow-engine: identifier allocation and the section status workflow.
//!
//! Two components, both generic over a [`RecordStore`](visaflow_storage::RecordStore):
//!
//! - [`Allocator`] issues `AP-`/`AG-`/`TK-YYMMDD##` identifiers and creates
//!   the records that carry them.
//! - [`WorkflowTracker`] moves record sections between statuses, keeps the
//!   audit trail, and dispatches notifications through a [`Notifier`].

pub mod allocator;
pub mod error;
pub mod notify;
pub mod tracker;

pub use allocator::{Allocator, DEFAULT_MAX_CREATE_ATTEMPTS};
pub use error::EngineError;
pub use notify::{LogNotifier, Notification, Notifier, NotifyError};
pub use tracker::{
    compose_notifications, NotificationMode, TransitionOutcome, TransitionRequest,
    WorkflowTracker, DEFAULT_MAX_SAVE_ATTEMPTS,
};
