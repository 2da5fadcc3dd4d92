use std::future::Future;

use visaflow_core::RecordKind;

use super::{identifier, make_application, make_record, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_create_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "create",
        "create_returns_record_unchanged",
        create_returns_record_unchanged(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "create_then_find_by_id",
        create_then_find_by_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "create_then_find_by_identifier",
        create_then_find_by_identifier(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "created_record_starts_at_version_0",
        created_record_starts_at_version_0(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "duplicate_identifier_rejected",
        duplicate_identifier_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "duplicate_identifier_leaves_no_trace",
        duplicate_identifier_leaves_no_trace(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "duplicate_id_rejected",
        duplicate_id_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "create",
        "records_without_identifier_coexist",
        records_without_identifier_coexist(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn create_returns_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_application("rec-1", "AP-24092601", "student-1");
    let created = s
        .create_record(record.clone())
        .await
        .map_err(|e| e.to_string())?;
    if created != record {
        return Err(format!("create returned {created:?}, expected {record:?}"));
    }
    Ok(())
}

async fn create_then_find_by_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_application("rec-1", "AP-24092601", "student-1");
    s.create_record(record.clone())
        .await
        .map_err(|e| e.to_string())?;

    let found = s.find_by_id("rec-1").await.map_err(|e| e.to_string())?;
    if found != record {
        return Err(format!("find_by_id returned {found:?}, expected {record:?}"));
    }
    Ok(())
}

async fn create_then_find_by_identifier<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_record(make_application("rec-2", "AP-24092602", "student-2"))
        .await
        .map_err(|e| e.to_string())?;

    let found = s
        .find_by_identifier(&identifier("AP-24092602"))
        .await
        .map_err(|e| e.to_string())?;
    if found.id != "rec-2" {
        return Err(format!("expected rec-2, got {}", found.id));
    }
    Ok(())
}

async fn created_record_starts_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let found = s.find_by_id("rec-1").await.map_err(|e| e.to_string())?;
    if found.version != 0 {
        return Err(format!("expected version 0, got {}", found.version));
    }
    Ok(())
}

async fn duplicate_identifier_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;

    match s
        .create_record(make_application("rec-2", "AP-24092601", "student-2"))
        .await
    {
        Err(StorageError::DuplicateIdentifier { identifier }) if identifier == "AP-24092601" => {
            Ok(())
        }
        other => Err(format!(
            "expected DuplicateIdentifier(AP-24092601), got {other:?}"
        )),
    }
}

/// A rejected create must not leave the second record reachable.
async fn duplicate_identifier_leaves_no_trace<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let _ = s
        .create_record(make_application("rec-2", "AP-24092601", "student-2"))
        .await;

    match s.find_by_id("rec-2").await {
        Err(StorageError::RecordNotFound { .. }) => {}
        other => return Err(format!("rec-2 should not exist, got {other:?}")),
    }
    let holder = s
        .find_by_identifier(&identifier("AP-24092601"))
        .await
        .map_err(|e| e.to_string())?;
    if holder.id != "rec-1" {
        return Err(format!("identifier now points at {}", holder.id));
    }
    Ok(())
}

async fn duplicate_id_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;

    match s
        .create_record(make_application("rec-1", "AP-24092602", "student-1"))
        .await
    {
        Err(StorageError::AlreadyExists { id }) if id == "rec-1" => {}
        other => return Err(format!("expected AlreadyExists(rec-1), got {other:?}")),
    }
    // The failed create must not have claimed its identifier.
    match s.find_by_identifier(&identifier("AP-24092602")).await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!("AP-24092602 should be unclaimed, got {other:?}")),
    }
}

async fn records_without_identifier_coexist<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (id, owner) in [("student-rec-1", "student-1"), ("student-rec-2", "student-2")] {
        s.create_record(make_record(
            id,
            None,
            RecordKind::Student,
            owner,
            "2024-09-26T09:00:00Z",
        ))
        .await
        .map_err(|e| format!("create {id}: {e}"))?;
    }
    let found = s
        .find_by_id("student-rec-2")
        .await
        .map_err(|e| e.to_string())?;
    if found.identifier.is_some() {
        return Err("student record gained an identifier".to_string());
    }
    Ok(())
}
