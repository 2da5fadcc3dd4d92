use std::future::Future;

use super::{make_application, make_transition, TestResult};
use crate::RecordStore;

pub(super) async fn run_transition_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "transitions",
        "inserted_transition_listed",
        inserted_transition_listed(factory).await,
    ));
    results.push(TestResult::from_result(
        "transitions",
        "transitions_listed_oldest_first",
        transitions_listed_oldest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "transitions",
        "transitions_scoped_to_record",
        transitions_scoped_to_record(factory).await,
    ));

    results
}

async fn inserted_transition_listed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let transition = make_transition("tr-1", "rec-1", "under review", "approved", 0);
    s.insert_transition(transition.clone())
        .await
        .map_err(|e| e.to_string())?;

    let listed = s
        .list_transitions("rec-1")
        .await
        .map_err(|e| e.to_string())?;
    if listed != [transition] {
        return Err(format!("unexpected transitions {listed:?}"));
    }
    Ok(())
}

async fn transitions_listed_oldest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    for (i, (from, to)) in [
        ("under review", "approved"),
        ("approved", "under review"),
        ("under review", "rejected"),
    ]
    .into_iter()
    .enumerate()
    {
        s.insert_transition(make_transition(
            &format!("tr-{i}"),
            "rec-1",
            from,
            to,
            i as i64,
        ))
        .await
        .map_err(|e| e.to_string())?;
    }

    let listed = s
        .list_transitions("rec-1")
        .await
        .map_err(|e| e.to_string())?;
    let versions: Vec<i64> = listed.iter().map(|t| t.from_version).collect();
    if versions != [0, 1, 2] {
        return Err(format!("expected from_versions [0, 1, 2], got {versions:?}"));
    }
    Ok(())
}

async fn transitions_scoped_to_record<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_transition(make_transition("tr-1", "rec-1", "under review", "approved", 0))
        .await
        .map_err(|e| e.to_string())?;

    let other = s
        .list_transitions("rec-2")
        .await
        .map_err(|e| e.to_string())?;
    if !other.is_empty() {
        return Err(format!("rec-2 should have no transitions, got {other:?}"));
    }
    Ok(())
}
