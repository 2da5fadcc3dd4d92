use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use visaflow_core::{Category, OfferLetterStatus, SectionName, SectionStatus};

use super::{day_key, make_application, TestResult};
use crate::{RecordStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_reservations_are_unique",
        concurrent_reservations_are_unique(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_saves_exactly_one_wins",
        concurrent_saves_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_creates_same_identifier_exactly_one_wins",
        concurrent_creates_same_identifier_exactly_one_wins(factory).await,
    ));

    results
}

// ── Concurrent reservation: no two tasks share a sequence ───────────────────

/// N tasks reserve on the same key at once. The results must be exactly
/// `1..=N`: no repeats, no gaps.
async fn concurrent_reservations_are_unique<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let key = day_key(Category::Application);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move { s.reserve_sequence(key).await }));
    }

    let mut seen = BTreeSet::new();
    for handle in handles {
        let sequence = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if !seen.insert(sequence) {
            return Err(format!("sequence {sequence} handed out twice"));
        }
    }

    let expected: BTreeSet<u32> = (1..=N as u32).collect();
    if seen != expected {
        return Err(format!("expected 1..={N}, got {seen:?}"));
    }
    Ok(())
}

// ── Concurrent save: exactly one wins ───────────────────────────────────────

/// N tasks each hold the same version-0 copy and try to save it. Exactly
/// one succeeds; the rest must get ConcurrentConflict.
async fn concurrent_saves_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let base = storage
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let mut copy = base.clone();
        handles.push(tokio::spawn(async move {
            if let Some(section) = copy.sections.get_mut(SectionName::OfferLetter) {
                section.status = SectionStatus::OfferLetter(OfferLetterStatus::Approved);
                section.message = Some(format!("writer {i}"));
            }
            match s.save(copy).await {
                Ok(_) => Ok(true),
                Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    let mut losers = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        } else {
            losers += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }

    let stored = storage
        .find_by_id("rec-1")
        .await
        .map_err(|e| format!("read: {e}"))?;
    if stored.version != 1 {
        return Err(format!("expected version 1, got {}", stored.version));
    }
    Ok(())
}

// ── Concurrent create with one identifier: exactly one wins ─────────────────

/// Models the allocate-then-create race: N tasks create distinct records
/// carrying the same identifier.
async fn concurrent_creates_same_identifier_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let record = make_application(&format!("rec-{i}"), "AP-24092601", "student-1");
            match s.create_record(record).await {
                Ok(_) => Ok(true),
                Err(StorageError::DuplicateIdentifier { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}
