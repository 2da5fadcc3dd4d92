//! Identifier allocation and record creation.
//!
//! `allocate` turns `(category, now)` into the next identifier of that
//! category's daily sequence. The counter itself lives in the store
//! ([`RecordStore::reserve_sequence`]) and is advanced atomically, so two
//! concurrent allocations never compute the same value. An identifier only
//! becomes durable once a record carrying it is created; `create` does both
//! steps and re-allocates if the store still reports a duplicate.

use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};
use uuid::Uuid;
use visaflow_core::{Category, DateStamp, Identifier, SequenceKey};
use visaflow_storage::{NewRecord, RecordStore, StorageError, WorkflowRecord};

use crate::error::EngineError;

/// Default number of create attempts before a duplicate identifier surfaces.
pub const DEFAULT_MAX_CREATE_ATTEMPTS: u32 = 3;

/// Allocates identifiers and creates records that carry them.
pub struct Allocator<S> {
    store: Arc<S>,
    offset: UtcOffset,
    max_create_attempts: u32,
}

impl<S> Clone for Allocator<S> {
    fn clone(&self) -> Self {
        Allocator {
            store: Arc::clone(&self.store),
            offset: self.offset,
            max_create_attempts: self.max_create_attempts,
        }
    }
}

impl<S: RecordStore> Allocator<S> {
    /// An allocator over `store` using the UTC calendar.
    pub fn new(store: Arc<S>) -> Self {
        Allocator {
            store,
            offset: UtcOffset::UTC,
            max_create_attempts: DEFAULT_MAX_CREATE_ATTEMPTS,
        }
    }

    /// Use the calendar at `offset` to decide which day a timestamp falls on.
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max_create_attempts(mut self, attempts: u32) -> Self {
        self.max_create_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The daily sequence `now` falls into for `category`.
    pub fn sequence_key(&self, category: Category, now: OffsetDateTime) -> SequenceKey {
        SequenceKey::new(category, DateStamp::from_datetime(now, self.offset))
    }

    /// Next identifier of `category` for the day of `now`.
    ///
    /// Fails with [`EngineError::ExhaustedSequence`] once the day's two-digit
    /// sequence is used up.
    #[tracing::instrument(skip_all, fields(category = %category))]
    pub async fn allocate(
        &self,
        category: Category,
        now: OffsetDateTime,
    ) -> Result<Identifier, EngineError> {
        let key = self.sequence_key(category, now);
        let sequence = self.store.reserve_sequence(key).await?;
        let identifier = key
            .identifier(sequence)
            .ok_or_else(|| EngineError::ExhaustedSequence { key: key.base_id() })?;
        debug!(%identifier, "allocated identifier");
        Ok(identifier)
    }

    /// [`allocate`](Self::allocate) against the system clock.
    pub async fn allocate_now(&self, category: Category) -> Result<Identifier, EngineError> {
        self.allocate(category, OffsetDateTime::now_utc()).await
    }

    /// Create a record, allocating its identifier first when its kind has one.
    ///
    /// A `DuplicateIdentifier` from the store triggers a fresh allocation, up
    /// to the configured number of attempts.
    #[tracing::instrument(skip_all, fields(kind = %new.kind, owner = %new.owner.id))]
    pub async fn create_with_identifier(
        &self,
        new: NewRecord,
        now: OffsetDateTime,
    ) -> Result<WorkflowRecord, EngineError> {
        let timestamp = format_timestamp(now)?;

        let Some(category) = new.kind.category() else {
            let record = WorkflowRecord::new(Uuid::new_v4().to_string(), None, new, timestamp);
            let created = self.store.create_record(record).await?;
            info!(id = %created.id, "record created");
            return Ok(created);
        };

        let mut attempt = 1;
        loop {
            let identifier = self.allocate(category, now).await?;
            let record = WorkflowRecord::new(
                Uuid::new_v4().to_string(),
                Some(identifier),
                new.clone(),
                timestamp.clone(),
            );
            match self.store.create_record(record).await {
                Ok(created) => {
                    info!(id = %created.id, %identifier, "record created");
                    return Ok(created);
                }
                Err(StorageError::DuplicateIdentifier { identifier })
                    if attempt < self.max_create_attempts =>
                {
                    warn!(%identifier, attempt, "identifier already taken, re-allocating");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn format_timestamp(now: OffsetDateTime) -> Result<String, EngineError> {
    now.to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|e| EngineError::Storage(StorageError::Backend(format!("bad timestamp: {e}"))))
}
