use std::future::Future;

use visaflow_core::{GicStatus, OfferLetterStatus, SectionName, SectionStatus};

use super::{identifier, make_application, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_save_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "save",
        "save_increments_version",
        save_increments_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "save",
        "saved_status_visible_on_next_read",
        saved_status_visible_on_next_read(factory).await,
    ));
    results.push(TestResult::from_result(
        "save",
        "saved_message_persists",
        saved_message_persists(factory).await,
    ));
    results.push(TestResult::from_result(
        "save",
        "sequential_saves_with_fresh_versions",
        sequential_saves_with_fresh_versions(factory).await,
    ));
    results.push(TestResult::from_result(
        "save",
        "stale_version_returns_conflict",
        stale_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "save",
        "conflict_leaves_record_unchanged",
        conflict_leaves_record_unchanged(factory).await,
    ));
    results.push(TestResult::from_result(
        "save",
        "identifier_and_created_at_are_immutable",
        identifier_and_created_at_are_immutable(factory).await,
    ));

    results
}

fn set_offer_letter(
    record: &mut crate::WorkflowRecord,
    status: OfferLetterStatus,
) -> Result<(), String> {
    let section = record
        .sections
        .get_mut(SectionName::OfferLetter)
        .ok_or("application record has no offerLetter section")?;
    section.status = SectionStatus::OfferLetter(status);
    Ok(())
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn save_increments_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let saved = s.save(record).await.map_err(|e| e.to_string())?;
    if saved.version != 1 {
        return Err(format!("expected version 1, got {}", saved.version));
    }
    Ok(())
}

async fn saved_status_visible_on_next_read<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut record = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    set_offer_letter(&mut record, OfferLetterStatus::Approved)?;
    s.save(record).await.map_err(|e| e.to_string())?;

    let read = s.find_by_id("rec-1").await.map_err(|e| e.to_string())?;
    let status = read.section(SectionName::OfferLetter).map(|sec| sec.status);
    if status != Some(SectionStatus::OfferLetter(OfferLetterStatus::Approved)) {
        return Err(format!("expected approved, got {status:?}"));
    }
    if read.version != 1 {
        return Err(format!("expected version 1, got {}", read.version));
    }
    Ok(())
}

async fn saved_message_persists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut record = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let gic = record
        .sections
        .get_mut(SectionName::Gic)
        .ok_or("application record has no gic section")?;
    gic.status = SectionStatus::Gic(GicStatus::Reject);
    gic.message = Some("missing documents".to_string());
    s.save(record).await.map_err(|e| e.to_string())?;

    let read = s
        .find_by_identifier(&identifier("AP-24092601"))
        .await
        .map_err(|e| e.to_string())?;
    let message = read
        .section(SectionName::Gic)
        .and_then(|sec| sec.message.as_deref());
    if message != Some("missing documents") {
        return Err(format!("expected message to persist, got {message:?}"));
    }
    Ok(())
}

async fn sequential_saves_with_fresh_versions<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut record = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    for (i, status) in [
        OfferLetterStatus::Approved,
        OfferLetterStatus::UnderReview,
        OfferLetterStatus::Rejected,
    ]
    .into_iter()
    .enumerate()
    {
        set_offer_letter(&mut record, status)?;
        record = s
            .save(record)
            .await
            .map_err(|e| format!("save {i}: {e}"))?;
        if record.version != i as i64 + 1 {
            return Err(format!(
                "after save {i} expected version {}, got {}",
                i + 1,
                record.version
            ));
        }
    }
    Ok(())
}

async fn stale_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let original = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let stale = original.clone();
    s.save(original).await.map_err(|e| e.to_string())?;

    match s.save(stale).await {
        Err(StorageError::ConcurrentConflict {
            id,
            expected_version,
        }) if id == "rec-1" && expected_version == 0 => Ok(()),
        other => Err(format!(
            "expected ConcurrentConflict(rec-1, 0), got {other:?}"
        )),
    }
}

async fn conflict_leaves_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut winner = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let mut loser = winner.clone();

    set_offer_letter(&mut winner, OfferLetterStatus::Approved)?;
    s.save(winner).await.map_err(|e| e.to_string())?;

    set_offer_letter(&mut loser, OfferLetterStatus::Rejected)?;
    if s.save(loser).await.is_ok() {
        return Err("stale save unexpectedly succeeded".to_string());
    }

    let read = s.find_by_id("rec-1").await.map_err(|e| e.to_string())?;
    let status = read.section(SectionName::OfferLetter).map(|sec| sec.status);
    if status != Some(SectionStatus::OfferLetter(OfferLetterStatus::Approved)) {
        return Err(format!("losing save leaked through: {status:?}"));
    }
    if read.version != 1 {
        return Err(format!("expected version 1, got {}", read.version));
    }
    Ok(())
}

async fn identifier_and_created_at_are_immutable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut record = s
        .create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    record.identifier = Some(identifier("AP-24092699"));
    record.created_at = "1999-01-01T00:00:00Z".to_string();
    let saved = s.save(record).await.map_err(|e| e.to_string())?;

    if saved.identifier != Some(identifier("AP-24092601")) {
        return Err(format!("identifier changed to {:?}", saved.identifier));
    }
    if saved.created_at != "2024-09-26T10:00:00Z" {
        return Err(format!("created_at changed to {}", saved.created_at));
    }
    match s.find_by_identifier(&identifier("AP-24092699")).await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!("AP-24092699 should be unclaimed, got {other:?}")),
    }
}
