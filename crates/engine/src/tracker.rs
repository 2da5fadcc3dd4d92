//! Section status transitions.
//!
//! A transition reads the record, validates the section and status against
//! the record's kind, applies the [`TransitionPolicy`], and saves the whole
//! document with a version check. A save that loses the race is retried on a
//! fresh read. Only after the save commits are the audit trail written and
//! notifications dispatched; neither can undo the committed status.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use visaflow_core::{
    Identifier, OfferLetterStatus, SectionName, SectionStatus, TransitionPolicy, ValidationError,
};
use visaflow_storage::{RecordStore, StorageError, TransitionRecord, WorkflowRecord};

use crate::error::EngineError;
use crate::notify::{dispatch, templates, Notification, Notifier};

/// Default number of save attempts before a concurrent conflict surfaces.
pub const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 3;

/// How notifications are dispatched once a transition has committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMode {
    /// Await the sends before returning.
    #[default]
    Inline,
    /// Hand the sends to a spawned task and return immediately.
    Background,
}

impl NotificationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationMode::Inline => "inline",
            NotificationMode::Background => "background",
        }
    }
}

impl fmt::Display for NotificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(NotificationMode::Inline),
            "background" => Ok(NotificationMode::Background),
            other => Err(format!(
                "unknown notification mode '{other}' (expected inline or background)"
            )),
        }
    }
}

/// A requested status change, still in raw form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Internal record id or external identifier.
    pub record: String,
    pub section: String,
    pub status: String,
    pub message: Option<String>,
    /// Id of the acting user, recorded in the audit trail.
    pub actor: Option<String>,
}

impl TransitionRequest {
    pub fn new(
        record: impl Into<String>,
        section: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        TransitionRequest {
            record: record.into(),
            section: section.into(),
            status: status.into(),
            message: None,
            actor: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub record: WorkflowRecord,
    /// Status of the section before the transition.
    pub previous: SectionStatus,
    /// Notifications attempted (inline) or queued (background).
    pub notifications: usize,
}

/// Applies section transitions to stored records.
pub struct WorkflowTracker<S> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    policy: TransitionPolicy,
    mode: NotificationMode,
    max_save_attempts: u32,
}

impl<S> Clone for WorkflowTracker<S> {
    fn clone(&self) -> Self {
        WorkflowTracker {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            policy: self.policy,
            mode: self.mode,
            max_save_attempts: self.max_save_attempts,
        }
    }
}

impl<S: RecordStore> WorkflowTracker<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        WorkflowTracker {
            store,
            notifier,
            policy: TransitionPolicy::default(),
            mode: NotificationMode::default(),
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notification_mode(mut self, mode: NotificationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_save_attempts(mut self, attempts: u32) -> Self {
        self.max_save_attempts = attempts.max(1);
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Look a record up by internal id, falling back to its identifier.
    pub async fn record(&self, key: &str) -> Result<WorkflowRecord, EngineError> {
        match self.store.find_by_id(key).await {
            Ok(record) => Ok(record),
            Err(StorageError::RecordNotFound { .. }) => match key.parse::<Identifier>() {
                Ok(identifier) => Ok(self.store.find_by_identifier(&identifier).await?),
                Err(_) => Err(EngineError::NotFound { id: key.to_string() }),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Move one section of a record to a new status.
    ///
    /// An unknown section name is rejected before anything is read; the
    /// status is checked against the section once the record is known to
    /// carry it.
    /// The message replaces the stored one only when the request carries
    /// one.
    #[tracing::instrument(
        skip_all,
        fields(record = %request.record, section = %request.section, status = %request.status)
    )]
    pub async fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, EngineError> {
        let section: SectionName = request.section.parse()?;

        let mut key = request.record.clone();
        let mut attempt = 1;
        loop {
            let mut record = self.record(&key).await?;
            key.clone_from(&record.id);

            let kind = record.kind;
            let Some(current) = record.sections.get_mut(section) else {
                return Err(ValidationError::InvalidSection { section, kind }.into());
            };
            let status = section.parse_status(&request.status)?;
            let previous = current.status;
            self.policy.check(previous, status)?;
            current.status = status;
            if let Some(message) = &request.message {
                current.message = Some(message.clone());
            }

            let from_version = record.version;
            match self.store.save(record).await {
                Ok(saved) => {
                    info!(
                        id = %saved.id,
                        from = %previous,
                        to = %status,
                        version = saved.version,
                        "section updated"
                    );
                    self.append_audit(&saved, section, previous, &request, from_version)
                        .await;
                    let notifications = self.notify(&saved, status).await;
                    return Ok(TransitionOutcome {
                        record: saved,
                        previous,
                        notifications,
                    });
                }
                Err(StorageError::ConcurrentConflict { .. }) if attempt < self.max_save_attempts => {
                    debug!(attempt, "record changed underneath, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Transition audit trail of a record, oldest first.
    pub async fn history(&self, key: &str) -> Result<Vec<TransitionRecord>, EngineError> {
        let record = self.record(key).await?;
        Ok(self.store.list_transitions(&record.id).await?)
    }

    async fn append_audit(
        &self,
        saved: &WorkflowRecord,
        section: SectionName,
        previous: SectionStatus,
        request: &TransitionRequest,
        from_version: i64,
    ) {
        let to_status = saved
            .section(section)
            .map(|s| s.status.as_str())
            .unwrap_or_default();
        let entry = TransitionRecord {
            id: Uuid::new_v4().to_string(),
            record_id: saved.id.clone(),
            section,
            from_status: previous.as_str().to_string(),
            to_status: to_status.to_string(),
            message: request.message.clone(),
            actor: request.actor.clone(),
            at: saved.updated_at.clone(),
            from_version,
            to_version: saved.version,
        };
        if let Err(e) = self.store.insert_transition(entry).await {
            warn!(id = %saved.id, error = %e, "failed to record transition");
        }
    }

    async fn notify(&self, record: &WorkflowRecord, status: SectionStatus) -> usize {
        let batch = compose_notifications(record, status);
        if batch.is_empty() {
            return 0;
        }
        let count = batch.len();
        match self.mode {
            NotificationMode::Inline => {
                let delivered = dispatch(self.notifier.as_ref(), &batch).await;
                debug!(count, delivered, "notifications sent");
            }
            NotificationMode::Background => {
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    dispatch(notifier.as_ref(), &batch).await;
                });
                debug!(count, "notifications queued");
            }
        }
        count
    }
}

/// Notifications owed for `record` after a section reached `status`.
///
/// Only offer letter decisions notify: the owner always, the linked agent
/// when there is one distinct from the owner.
pub fn compose_notifications(record: &WorkflowRecord, status: SectionStatus) -> Vec<Notification> {
    match status {
        SectionStatus::OfferLetter(OfferLetterStatus::Approved | OfferLetterStatus::Rejected) => {}
        _ => return Vec::new(),
    }
    let mut batch = vec![templates::offer_letter_decision(record, &record.owner, status)];
    if let Some(agent) = record.agent.as_ref().filter(|a| a.id != record.owner.id) {
        batch.push(templates::offer_letter_decision(record, agent, status));
    }
    batch
}
