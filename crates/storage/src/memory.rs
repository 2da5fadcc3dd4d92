//! In-memory `RecordStore` backend.
//!
//! All state lives behind one `tokio::sync::RwLock`, which makes every trait
//! method atomic with respect to the others. Cloning a `MemoryStore` shares
//! the same state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use visaflow_core::{Identifier, SequenceKey};

use crate::error::StorageError;
use crate::record::{RecordFilter, TransitionRecord, WorkflowRecord};
use crate::traits::RecordStore;

#[derive(Default)]
struct Inner {
    records: HashMap<String, WorkflowRecord>,
    /// Rendered identifier -> internal id. Ordered for prefix scans.
    identifiers: BTreeMap<String, String>,
    counters: HashMap<SequenceKey, u32>,
    transitions: Vec<TransitionRecord>,
}

impl Inner {
    fn latest_by_prefix(&self, prefix: &str) -> Option<Identifier> {
        self.identifiers
            .range(prefix.to_string()..)
            .take_while(|(identifier, _)| identifier.starts_with(prefix))
            .last()
            .and_then(|(identifier, _)| identifier.parse().ok())
    }
}

/// Volatile record store. Everything is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_latest_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<Identifier>, StorageError> {
        Ok(self.inner.read().await.latest_by_prefix(prefix))
    }

    async fn reserve_sequence(&self, key: SequenceKey) -> Result<u32, StorageError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .latest_by_prefix(&key.base_id())
            .map(|identifier| identifier.sequence())
            .unwrap_or(0);
        let counter = inner.counters.get(&key).copied().unwrap_or(0);
        let next = counter.max(stored).saturating_add(1);
        inner.counters.insert(key, next);
        Ok(next)
    }

    async fn create_record(&self, record: WorkflowRecord) -> Result<WorkflowRecord, StorageError> {
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&record.id) {
            return Err(StorageError::AlreadyExists {
                id: record.id.clone(),
            });
        }
        if let Some(identifier) = &record.identifier {
            let rendered = identifier.to_string();
            if inner.identifiers.contains_key(&rendered) {
                return Err(StorageError::DuplicateIdentifier {
                    identifier: rendered,
                });
            }
            inner.identifiers.insert(rendered, record.id.clone());
        }
        inner.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> Result<WorkflowRecord, StorageError> {
        self.inner
            .read()
            .await
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound { id: id.to_string() })
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<WorkflowRecord, StorageError> {
        let inner = self.inner.read().await;
        let rendered = identifier.to_string();
        inner
            .identifiers
            .get(&rendered)
            .and_then(|id| inner.records.get(id))
            .cloned()
            .ok_or(StorageError::RecordNotFound { id: rendered })
    }

    async fn save(&self, record: WorkflowRecord) -> Result<WorkflowRecord, StorageError> {
        let updated_at = crate::now_rfc3339()?;
        let mut inner = self.inner.write().await;
        let stored = inner
            .records
            .get_mut(&record.id)
            .ok_or_else(|| StorageError::RecordNotFound {
                id: record.id.clone(),
            })?;
        if stored.version != record.version {
            return Err(StorageError::ConcurrentConflict {
                id: record.id.clone(),
                expected_version: record.version,
            });
        }
        let saved = WorkflowRecord {
            identifier: stored.identifier,
            kind: stored.kind,
            created_at: stored.created_at.clone(),
            version: stored.version + 1,
            updated_at,
            ..record
        };
        *stored = saved.clone();
        Ok(saved)
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<WorkflowRecord>, StorageError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<WorkflowRecord> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if filter.limit > 0 {
            matching.truncate(filter.limit);
        }
        Ok(matching)
    }

    async fn insert_transition(&self, record: TransitionRecord) -> Result<(), StorageError> {
        self.inner.write().await.transitions.push(record);
        Ok(())
    }

    async fn list_transitions(
        &self,
        record_id: &str,
    ) -> Result<Vec<TransitionRecord>, StorageError> {
        Ok(self
            .inner
            .read()
            .await
            .transitions
            .iter()
            .filter(|t| t.record_id == record_id)
            .cloned()
            .collect())
    }
}
