use std::future::Future;

use super::{identifier, make_application, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "find_by_id_nonexistent",
        find_by_id_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "find_by_id_not_found_has_correct_id",
        find_by_id_not_found_has_correct_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "find_by_identifier_nonexistent",
        find_by_identifier_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "save_nonexistent",
        save_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "list_transitions_empty_for_nonexistent",
        list_transitions_empty_for_nonexistent(factory).await,
    ));

    results
}

async fn find_by_id_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.find_by_id("rec-999").await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!("expected RecordNotFound, got {other:?}")),
    }
}

async fn find_by_id_not_found_has_correct_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.find_by_id("rec-999").await {
        Err(StorageError::RecordNotFound { id }) if id == "rec-999" => Ok(()),
        other => Err(format!("expected RecordNotFound(rec-999), got {other:?}")),
    }
}

async fn find_by_identifier_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.find_by_identifier(&identifier("TK-24092601")).await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!("expected RecordNotFound, got {other:?}")),
    }
}

async fn save_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s
        .save(make_application("rec-1", "AP-24092601", "student-1"))
        .await
    {
        Err(StorageError::RecordNotFound { id }) if id == "rec-1" => Ok(()),
        other => Err(format!("expected RecordNotFound(rec-1), got {other:?}")),
    }
}

async fn list_transitions_empty_for_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let listed = s
        .list_transitions("rec-999")
        .await
        .map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err(format!("expected empty list, got {listed:?}"));
    }
    Ok(())
}
