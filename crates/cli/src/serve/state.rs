//! Application state and caller identity.

use std::sync::Arc;

use visaflow_core::Role;
use visaflow_engine::{Allocator, LogNotifier, WorkflowTracker};
use visaflow_storage::MemoryStore;

use crate::config::{ConfigError, VisaflowConfig};

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) allocator: Allocator<MemoryStore>,
    pub(crate) tracker: WorkflowTracker<MemoryStore>,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
}

impl AppState {
    /// Wire the allocator and tracker to one store as `config` describes.
    pub(crate) fn from_config(config: &VisaflowConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(MemoryStore::new());
        let allocator = Allocator::new(Arc::clone(&store))
            .with_utc_offset(config.utc_offset()?)
            .with_max_create_attempts(config.workflow.max_create_attempts);
        let tracker = WorkflowTracker::new(store, Arc::new(LogNotifier))
            .with_policy(config.workflow.transition_policy)
            .with_notification_mode(config.workflow.notifications)
            .with_max_save_attempts(config.workflow.max_save_attempts);
        Ok(AppState {
            allocator,
            tracker,
            api_key: config.server.api_key.clone(),
        })
    }
}

/// The caller, as identified by the `X-Actor-Role` and `X-Actor-Id` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Actor {
    pub(crate) role: Role,
    pub(crate) id: String,
}
