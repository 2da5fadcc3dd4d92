use serde::{Deserialize, Serialize};
use visaflow_core::{Identifier, RecordKind, Section, SectionName, SectionStatus, Sections};

/// A person a record refers to: the owning student or agent, or a linked agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A workflow record as stored in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Internal record key.
    pub id: String,
    /// External reference (`AP-...`, `AG-...`, `TK-...`). `None` for student
    /// profiles.
    pub identifier: Option<Identifier>,
    pub kind: RecordKind,
    pub owner: Party,
    /// The agent the record is associated with, if any.
    pub agent: Option<Party>,
    pub sections: Sections,
    /// Descriptive document data (institution, program, ticket subject...).
    pub details: serde_json::Value,
    pub version: i64,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}

impl WorkflowRecord {
    /// Build a fresh record at version 0 with every section at its initial status.
    pub fn new(
        id: String,
        identifier: Option<Identifier>,
        new: NewRecord,
        timestamp: String,
    ) -> Self {
        WorkflowRecord {
            id,
            identifier,
            kind: new.kind,
            sections: Sections::initial_for(new.kind),
            owner: new.owner,
            agent: new.agent,
            details: new.details,
            version: 0,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    pub fn section(&self, name: SectionName) -> Option<&Section> {
        self.sections.get(name)
    }

    /// True if `party_id` owns the record or is its linked agent.
    pub fn involves(&self, party_id: &str) -> bool {
        self.owner.id == party_id || self.agent.as_ref().is_some_and(|a| a.id == party_id)
    }
}

/// Creation payload. Sections, identifier and timestamps are filled in by
/// the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub owner: Party,
    #[serde(default)]
    pub agent: Option<Party>,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// A record of a single section transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: String,
    pub record_id: String,
    pub section: SectionName,
    pub from_status: String,
    pub to_status: String,
    pub message: Option<String>,
    /// Id of the actor who applied the transition, when known.
    pub actor: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub at: String,
    pub from_version: i64,
    pub to_version: i64,
}

/// Query filter for [`RecordStore::list_records`](crate::RecordStore::list_records).
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub kind: Option<RecordKind>,
    /// Only records owned by this party.
    pub owner_id: Option<String>,
    /// Only records owned by, or linked to, this party.
    pub party_id: Option<String>,
    /// Only records whose section currently has this status.
    pub section_status: Option<SectionStatus>,
    /// Maximum number of results (0 = no limit).
    pub limit: usize,
}

impl RecordFilter {
    pub fn matches(&self, record: &WorkflowRecord) -> bool {
        if self.kind.is_some_and(|k| k != record.kind) {
            return false;
        }
        if let Some(owner_id) = &self.owner_id {
            if &record.owner.id != owner_id {
                return false;
            }
        }
        if let Some(party_id) = &self.party_id {
            if !record.involves(party_id) {
                return false;
            }
        }
        if let Some(status) = self.section_status {
            match record.section(status.section()) {
                Some(section) if section.status == status => {}
                _ => return false,
            }
        }
        true
    }
}
