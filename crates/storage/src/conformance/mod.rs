//! Conformance test suite for `RecordStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `RecordStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Creation**: insert, read back by id and identifier, duplicate detection
//! - **Sequences**: prefix queries, counter reservation and seeding
//! - **Save / OCC**: version checks, immutable fields, message persistence
//! - **Queries**: filtering and ordering of `list_records`
//! - **Transitions**: audit trail append and lookup
//! - **Error handling**: correct error variants for missing records
//! - **Concurrency**: reservations and saves racing across tasks
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use visaflow_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn mongo_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_mongo_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod create;
mod error;
mod query;
mod save;
mod sequence;
mod transitions;

use std::fmt;
use std::future::Future;

use visaflow_core::{Category, DateStamp, Identifier, RecordKind, SectionName, SequenceKey};

use crate::record::{NewRecord, Party, TransitionRecord, WorkflowRecord};
use crate::RecordStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "create", "sequence", "save").
    pub category: String,
    /// Test name (e.g. "create_then_find_by_id").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(create::run_create_tests(&factory).await);
    results.extend(sequence::run_sequence_tests(&factory).await);
    results.extend(save::run_save_tests(&factory).await);
    results.extend(query::run_query_tests(&factory).await);
    results.extend(transitions::run_transition_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn party(id: &str) -> Party {
    Party {
        id: id.to_string(),
        name: format!("Name of {id}"),
        email: format!("{id}@example.test"),
    }
}

fn identifier(raw: &str) -> Identifier {
    match raw.parse() {
        Ok(identifier) => identifier,
        Err(e) => panic!("fixture identifier '{raw}' is malformed: {e}"),
    }
}

/// The key of 2024-09-26 for `category`.
fn day_key(category: Category) -> SequenceKey {
    SequenceKey::new(
        category,
        DateStamp::from_date(time::macros::date!(2024 - 09 - 26)),
    )
}

fn make_record(
    id: &str,
    identifier_raw: Option<&str>,
    kind: RecordKind,
    owner_id: &str,
    created_at: &str,
) -> WorkflowRecord {
    WorkflowRecord::new(
        id.to_string(),
        identifier_raw.map(identifier),
        NewRecord {
            kind,
            owner: party(owner_id),
            agent: None,
            details: serde_json::json!({ "fixture": id }),
        },
        created_at.to_string(),
    )
}

fn make_application(id: &str, identifier_raw: &str, owner_id: &str) -> WorkflowRecord {
    make_record(
        id,
        Some(identifier_raw),
        RecordKind::Application,
        owner_id,
        "2024-09-26T10:00:00Z",
    )
}

fn make_transition(id: &str, record_id: &str, from: &str, to: &str, from_version: i64) -> TransitionRecord {
    TransitionRecord {
        id: id.to_string(),
        record_id: record_id.to_string(),
        section: SectionName::OfferLetter,
        from_status: from.to_string(),
        to_status: to.to_string(),
        message: None,
        actor: Some("admin-1".to_string()),
        at: "2024-09-26T11:00:00Z".to_string(),
        from_version,
        to_version: from_version + 1,
    }
}
