//! End-to-end behavior of the allocator and the workflow tracker over the
//! in-memory store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::macros::datetime;
use time::OffsetDateTime;
use visaflow_core::{
    Category, Identifier, RecordKind, SectionName, SequenceKey, TransitionPolicy,
    ValidationError,
};
use visaflow_engine::{
    Allocator, EngineError, Notification, NotificationMode, Notifier, NotifyError,
    TransitionRequest, WorkflowTracker,
};
use visaflow_storage::{
    MemoryStore, NewRecord, Party, RecordFilter, RecordStore, StorageError, TransitionRecord,
    WorkflowRecord,
};

const DAY: OffsetDateTime = datetime!(2024-09-26 09:30 UTC);

// ── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().expect("lock").push(notification.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery {
            to: notification.to.clone(),
            reason: "smtp unreachable".into(),
        })
    }
}

/// A `MemoryStore` that can be told to misbehave: hand out stale sequence
/// numbers, or let another writer sneak in before a save.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    stale_reservations: AtomicU32,
    interleaved_saves: AtomicU32,
}

fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn find_latest_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<Identifier>, StorageError> {
        self.inner.find_latest_by_prefix(prefix).await
    }

    async fn reserve_sequence(&self, key: SequenceKey) -> Result<u32, StorageError> {
        if take(&self.stale_reservations) {
            return Ok(1);
        }
        self.inner.reserve_sequence(key).await
    }

    async fn create_record(&self, record: WorkflowRecord) -> Result<WorkflowRecord, StorageError> {
        self.inner.create_record(record).await
    }

    async fn find_by_id(&self, id: &str) -> Result<WorkflowRecord, StorageError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<WorkflowRecord, StorageError> {
        self.inner.find_by_identifier(identifier).await
    }

    async fn save(&self, record: WorkflowRecord) -> Result<WorkflowRecord, StorageError> {
        if take(&self.interleaved_saves) {
            let mut other = self.inner.find_by_id(&record.id).await?;
            other.details = serde_json::json!({ "touched": true });
            self.inner.save(other).await?;
        }
        self.inner.save(record).await
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<WorkflowRecord>, StorageError> {
        self.inner.list_records(filter).await
    }

    async fn insert_transition(&self, record: TransitionRecord) -> Result<(), StorageError> {
        self.inner.insert_transition(record).await
    }

    async fn list_transitions(
        &self,
        record_id: &str,
    ) -> Result<Vec<TransitionRecord>, StorageError> {
        self.inner.list_transitions(record_id).await
    }
}

fn party(id: &str) -> Party {
    Party {
        id: id.into(),
        name: format!("Name of {id}"),
        email: format!("{id}@example.com"),
    }
}

fn application(owner: &str, agent: Option<&str>) -> NewRecord {
    NewRecord {
        kind: RecordKind::Application,
        owner: party(owner),
        agent: agent.map(party),
        details: serde_json::json!({ "institution": "Lakeside College" }),
    }
}

fn pipeline<S: RecordStore>(
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
) -> (Allocator<S>, WorkflowTracker<S>) {
    (
        Allocator::new(Arc::clone(&store)),
        WorkflowTracker::new(store, notifier),
    )
}

fn offer_letter_status(record: &WorkflowRecord) -> &'static str {
    record
        .section(SectionName::OfferLetter)
        .map(|s| s.status.as_str())
        .unwrap_or("<missing>")
}

// ── Allocation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_allocations_have_no_gaps() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    let mut sequences = Vec::new();
    for _ in 0..7 {
        let id = allocator
            .allocate(Category::Ticket, DAY)
            .await
            .expect("allocate");
        sequences.push(id.sequence());
    }
    assert_eq!(sequences, (1..=7).collect::<Vec<u32>>());
}

#[tokio::test]
async fn new_day_restarts_at_01() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    for _ in 0..3 {
        allocator
            .allocate(Category::Agent, DAY)
            .await
            .expect("allocate");
    }
    let next_day = allocator
        .allocate(Category::Agent, datetime!(2024-09-27 00:05 UTC))
        .await
        .expect("allocate");
    assert_eq!(next_day.to_string(), "AG-24092701");
}

#[tokio::test]
async fn identifiers_carry_the_category_prefix() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    for (category, prefix) in [
        (Category::Application, "AP-"),
        (Category::Agent, "AG-"),
        (Category::Ticket, "TK-"),
    ] {
        let rendered = allocator
            .allocate(category, DAY)
            .await
            .expect("allocate")
            .to_string();
        let digits = rendered
            .strip_prefix(prefix)
            .unwrap_or_else(|| panic!("{rendered} lacks {prefix}"));
        assert_eq!(digits.len(), 8, "{rendered}");
        assert!(digits.chars().all(|c| c.is_ascii_digit()), "{rendered}");
    }
}

#[tokio::test]
async fn categories_count_independently() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    allocator
        .allocate(Category::Application, DAY)
        .await
        .expect("allocate");
    let ticket = allocator
        .allocate(Category::Ticket, DAY)
        .await
        .expect("allocate");
    assert_eq!(ticket.to_string(), "TK-24092601");
}

#[tokio::test]
async fn sequence_past_99_is_rejected() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    for _ in 0..99 {
        allocator
            .allocate(Category::Ticket, DAY)
            .await
            .expect("within range");
    }
    let err = allocator
        .allocate(Category::Ticket, DAY)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "exhausted_sequence");
    assert!(err.to_string().contains("TK-240926"));
}

#[tokio::test]
async fn counter_respects_identifiers_already_stored() {
    let store = Arc::new(MemoryStore::new());
    let existing = WorkflowRecord::new(
        "legacy".into(),
        Some("AP-24092607".parse().expect("identifier")),
        application("student-0", None),
        "2024-09-26T08:00:00Z".into(),
    );
    store.create_record(existing).await.expect("seed");

    let allocator = Allocator::new(store);
    let id = allocator
        .allocate(Category::Application, DAY)
        .await
        .expect("allocate");
    assert_eq!(id.to_string(), "AP-24092608");
}

#[tokio::test]
async fn concurrent_creates_get_distinct_identifiers() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    let mut handles = Vec::new();
    for i in 0..20 {
        let allocator = allocator.clone();
        handles.push(tokio::spawn(async move {
            allocator
                .create_with_identifier(application(&format!("student-{i}"), None), DAY)
                .await
        }));
    }
    let mut seen = std::collections::BTreeSet::new();
    for handle in handles {
        let record = handle.await.expect("join").expect("create");
        assert!(seen.insert(record.identifier.expect("identifier").sequence()));
    }
    assert_eq!(seen, (1..=20).collect::<std::collections::BTreeSet<u32>>());
}

#[tokio::test]
async fn create_skips_identifier_taken_behind_the_counter() {
    let store = Arc::new(FlakyStore::default());
    let taken = WorkflowRecord::new(
        "legacy".into(),
        Some("AP-24092601".parse().expect("identifier")),
        application("student-0", None),
        "2024-09-26T08:00:00Z".into(),
    );
    store.inner.create_record(taken).await.expect("seed");
    store.stale_reservations.store(1, Ordering::SeqCst);

    let allocator = Allocator::new(Arc::clone(&store));
    let created = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create after retry");
    assert_eq!(
        created.identifier.map(|id| id.to_string()).as_deref(),
        Some("AP-24092602")
    );
}

#[tokio::test]
async fn create_gives_up_after_max_attempts() {
    let store = Arc::new(FlakyStore::default());
    let taken = WorkflowRecord::new(
        "legacy".into(),
        Some("AP-24092601".parse().expect("identifier")),
        application("student-0", None),
        "2024-09-26T08:00:00Z".into(),
    );
    store.inner.create_record(taken).await.expect("seed");
    store.stale_reservations.store(u32::MAX, Ordering::SeqCst);

    let allocator = Allocator::new(Arc::clone(&store)).with_max_create_attempts(3);
    let err = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateIdentifier { .. }), "{err:?}");
    assert_eq!(store.inner.len().await, 1);
}

#[tokio::test]
async fn student_records_have_no_identifier() {
    let allocator = Allocator::new(Arc::new(MemoryStore::new()));
    let record = allocator
        .create_with_identifier(
            NewRecord {
                kind: RecordKind::Student,
                owner: party("student-1"),
                agent: None,
                details: serde_json::Value::Null,
            },
            DAY,
        )
        .await
        .expect("create");
    assert!(record.identifier.is_none());
    assert_eq!(
        record.section(SectionName::PageStatus).map(|s| s.status.as_str()),
        Some("registering")
    );
}

// ── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_transition_is_persisted() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");

    let outcome = tracker
        .transition(TransitionRequest::new(&record.id, "offerLetter", "approved"))
        .await
        .expect("transition");
    assert_eq!(outcome.previous.as_str(), "under review");
    assert_eq!(offer_letter_status(&outcome.record), "approved");

    let reread = tracker.record(&record.id).await.expect("read");
    assert_eq!(offer_letter_status(&reread), "approved");
    assert_eq!(reread.version, 1);
}

#[tokio::test]
async fn invalid_status_leaves_record_untouched() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");

    let err = tracker
        .transition(TransitionRequest::new(
            &record.id,
            "offerLetter",
            "not-a-real-status",
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::InvalidStatus { .. })
    ));

    let reread = tracker.record(&record.id).await.expect("read");
    assert_eq!(offer_letter_status(&reread), "under review");
    assert_eq!(reread.version, 0);
}

#[tokio::test]
async fn section_must_belong_to_the_record_kind() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");

    let err = tracker
        .transition(TransitionRequest::new(&record.id, "pageStatus", "completed"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::InvalidSection { .. })
    ));
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let (_, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    for key in ["no-such-record", "AP-24092699"] {
        let err = tracker
            .transition(TransitionRequest::new(key, "gic", "success"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found", "{key}");
    }
}

#[tokio::test]
async fn unknown_record_wins_over_bad_status() {
    let (_, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let err = tracker
        .transition(TransitionRequest::new("no-such-record", "offerLetter", "bogus"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn foreign_section_is_invalid_section_whatever_the_status() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let ticket = allocator
        .create_with_identifier(
            NewRecord {
                kind: RecordKind::Ticket,
                owner: party("student-1"),
                agent: None,
                details: serde_json::json!({ "subject": "visa appointment" }),
            },
            DAY,
        )
        .await
        .expect("create");

    let err = tracker
        .transition(TransitionRequest::new(&ticket.id, "gic", "approved"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            EngineError::Validation(ValidationError::InvalidSection {
                section: SectionName::Gic,
                kind: RecordKind::Ticket,
            })
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn message_survives_transitions_without_one() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");

    tracker
        .transition(
            TransitionRequest::new(&record.id, "gic", "reject").with_message("missing documents"),
        )
        .await
        .expect("reject");
    let gic = |r: &WorkflowRecord| r.section(SectionName::Gic).cloned().expect("gic");

    let after_reject = tracker.record(&record.id).await.expect("read");
    assert_eq!(gic(&after_reject).message.as_deref(), Some("missing documents"));

    tracker
        .transition(TransitionRequest::new(&record.id, "gic", "under review"))
        .await
        .expect("reopen");
    let after_reopen = tracker.record(&record.id).await.expect("read");
    assert_eq!(gic(&after_reopen).status.as_str(), "under review");
    assert_eq!(gic(&after_reopen).message.as_deref(), Some("missing documents"));
}

#[tokio::test]
async fn transition_by_identifier_reads_back_by_id() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(
            NewRecord {
                kind: RecordKind::Ticket,
                owner: party("student-1"),
                agent: None,
                details: serde_json::json!({ "subject": "visa appointment" }),
            },
            DAY,
        )
        .await
        .expect("create");
    assert_eq!(
        record.identifier.map(|id| id.to_string()).as_deref(),
        Some("TK-24092601")
    );

    tracker
        .transition(TransitionRequest::new("TK-24092601", "ticket", "approved"))
        .await
        .expect("transition");
    let reread = tracker.record(&record.id).await.expect("read");
    assert_eq!(
        reread.section(SectionName::Ticket).map(|s| s.status.as_str()),
        Some("approved")
    );
}

#[tokio::test]
async fn example_scenario_notifies_student_and_agent() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (allocator, tracker) = pipeline(Arc::new(MemoryStore::new()), notifier.clone());

    let mut records = Vec::new();
    for i in 0..3 {
        let agent = (i == 0).then_some("agent-1");
        records.push(
            allocator
                .create_with_identifier(application(&format!("student-{i}"), agent), DAY)
                .await
                .expect("create"),
        );
    }
    let identifiers: Vec<String> = records
        .iter()
        .filter_map(|r| r.identifier.map(|id| id.to_string()))
        .collect();
    assert_eq!(identifiers, ["AP-24092601", "AP-24092602", "AP-24092603"]);

    let outcome = tracker
        .transition(TransitionRequest::new(&records[0].id, "offerLetter", "approved"))
        .await
        .expect("transition");
    assert_eq!(outcome.notifications, 2);
    assert_eq!(offer_letter_status(&outcome.record), "approved");

    let recipients: Vec<String> = notifier.sent().into_iter().map(|n| n.to).collect();
    assert_eq!(recipients, ["student-0@example.com", "agent-1@example.com"]);

    let persisted = tracker.record("AP-24092601").await.expect("read");
    assert_eq!(offer_letter_status(&persisted), "approved");
}

#[tokio::test]
async fn rejection_without_agent_notifies_student_only() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (allocator, tracker) = pipeline(Arc::new(MemoryStore::new()), notifier.clone());
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");

    let outcome = tracker
        .transition(
            TransitionRequest::new(&record.id, "offerLetter", "reject")
                .with_message("program full"),
        )
        .await
        .expect("transition");
    assert_eq!(offer_letter_status(&outcome.record), "rejected");
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html_body.contains("program full"));
}

#[tokio::test]
async fn notification_failure_does_not_fail_transition() {
    let (allocator, tracker) = pipeline(Arc::new(MemoryStore::new()), Arc::new(FailingNotifier));
    let record = allocator
        .create_with_identifier(application("student-1", Some("agent-1")), DAY)
        .await
        .expect("create");

    let outcome = tracker
        .transition(TransitionRequest::new(&record.id, "offerLetter", "approved"))
        .await
        .expect("transition despite failing notifier");
    assert_eq!(outcome.notifications, 2);

    let reread = tracker.record(&record.id).await.expect("read");
    assert_eq!(offer_letter_status(&reread), "approved");
}

#[tokio::test]
async fn background_notifications_are_delivered() {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());
    let allocator = Allocator::new(Arc::clone(&store));
    let tracker = WorkflowTracker::new(store, notifier.clone())
        .with_notification_mode(NotificationMode::Background);
    let record = allocator
        .create_with_identifier(application("student-1", Some("agent-1")), DAY)
        .await
        .expect("create");

    let outcome = tracker
        .transition(TransitionRequest::new(&record.id, "offerLetter", "approved"))
        .await
        .expect("transition");
    assert_eq!(outcome.notifications, 2);

    for _ in 0..100 {
        if notifier.sent().len() == 2 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background notifications never arrived: {:?}", notifier.sent());
}

#[tokio::test]
async fn forward_only_policy_blocks_leaving_terminal_status() {
    let store = Arc::new(MemoryStore::new());
    let allocator = Allocator::new(Arc::clone(&store));
    let tracker = WorkflowTracker::new(store, Arc::new(RecordingNotifier::default()))
        .with_policy(TransitionPolicy::ForwardOnly);
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");

    tracker
        .transition(TransitionRequest::new(&record.id, "offerLetter", "approved"))
        .await
        .expect("forward move");
    tracker
        .transition(
            TransitionRequest::new(&record.id, "offerLetter", "approved")
                .with_message("see attached letter"),
        )
        .await
        .expect("re-applying the same status is allowed");

    let err = tracker
        .transition(TransitionRequest::new(&record.id, "offerLetter", "under review"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::ForbiddenTransition { .. })
    ));
    let reread = tracker.record(&record.id).await.expect("read");
    assert_eq!(offer_letter_status(&reread), "approved");
}

#[tokio::test]
async fn permissive_policy_allows_moving_back() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");
    for status in ["approved", "under review"] {
        tracker
            .transition(TransitionRequest::new(&record.id, "offerLetter", status))
            .await
            .expect("transition");
    }
    let reread = tracker.record(&record.id).await.expect("read");
    assert_eq!(offer_letter_status(&reread), "under review");
}

#[tokio::test]
async fn lost_save_race_is_retried_on_fresh_read() {
    let store = Arc::new(FlakyStore::default());
    let (allocator, tracker) = pipeline(Arc::clone(&store), Arc::new(RecordingNotifier::default()));
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");
    store.interleaved_saves.store(1, Ordering::SeqCst);

    let outcome = tracker
        .transition(TransitionRequest::new(&record.id, "gic", "success"))
        .await
        .expect("transition after retry");
    assert_eq!(outcome.record.version, 2);
    assert_eq!(outcome.record.details, serde_json::json!({ "touched": true }));
    assert_eq!(
        outcome.record.section(SectionName::Gic).map(|s| s.status.as_str()),
        Some("success")
    );
}

#[tokio::test]
async fn persistent_conflict_surfaces_after_max_attempts() {
    let store = Arc::new(FlakyStore::default());
    let allocator = Allocator::new(Arc::clone(&store));
    let tracker = WorkflowTracker::new(Arc::clone(&store), Arc::new(RecordingNotifier::default()))
        .with_max_save_attempts(2);
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");
    store.interleaved_saves.store(u32::MAX, Ordering::SeqCst);

    let err = tracker
        .transition(TransitionRequest::new(&record.id, "gic", "success"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn history_lists_transitions_in_order() {
    let (allocator, tracker) = pipeline(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
    );
    let record = allocator
        .create_with_identifier(application("student-1", None), DAY)
        .await
        .expect("create");
    tracker
        .transition(TransitionRequest::new(&record.id, "gic", "reject").with_actor("admin-1"))
        .await
        .expect("reject");
    tracker
        .transition(TransitionRequest::new(&record.id, "gic", "success"))
        .await
        .expect("success");

    let history = tracker.history("AP-24092601").await.expect("history");
    let steps: Vec<(&str, &str, i64)> = history
        .iter()
        .map(|t| (t.from_status.as_str(), t.to_status.as_str(), t.to_version))
        .collect();
    assert_eq!(
        steps,
        [("under review", "reject", 1), ("reject", "success", 2)]
    );
    assert_eq!(history[0].actor.as_deref(), Some("admin-1"));
    assert_eq!(history[1].actor, None);
}
