use std::future::Future;

use visaflow_core::{Category, DateStamp, SequenceKey};

use super::{day_key, make_application, make_record, TestResult};
use crate::RecordStore;

pub(super) async fn run_sequence_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Prefix queries
    results.push(TestResult::from_result(
        "sequence",
        "latest_by_prefix_empty_store",
        latest_by_prefix_empty_store(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "latest_by_prefix_picks_greatest",
        latest_by_prefix_picks_greatest(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "latest_by_prefix_ignores_other_days_and_categories",
        latest_by_prefix_ignores_other_days_and_categories(factory).await,
    ));

    // Reservation
    results.push(TestResult::from_result(
        "sequence",
        "first_reservation_is_one",
        first_reservation_is_one(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "reservations_are_sequential",
        reservations_are_sequential(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "keys_are_independent",
        keys_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "reservation_seeded_from_stored_identifiers",
        reservation_seeded_from_stored_identifiers(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "reservation_catches_up_with_later_records",
        reservation_catches_up_with_later_records(factory).await,
    ));
    results.push(TestResult::from_result(
        "sequence",
        "reservation_continues_past_99",
        reservation_continues_past_99(factory).await,
    ));

    results
}

// ── Prefix queries ────────────────────────────────────────────────────────────

async fn latest_by_prefix_empty_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.find_latest_by_prefix("AP-240926").await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {other:?}")),
    }
}

async fn latest_by_prefix_picks_greatest<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    // Inserted out of order on purpose.
    for (id, identifier) in [
        ("rec-a", "AP-24092603"),
        ("rec-b", "AP-24092611"),
        ("rec-c", "AP-24092602"),
    ] {
        s.create_record(make_application(id, identifier, "student-1"))
            .await
            .map_err(|e| format!("create {identifier}: {e}"))?;
    }
    let latest = s
        .find_latest_by_prefix("AP-240926")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("expected a latest identifier")?;
    if latest.to_string() != "AP-24092611" {
        return Err(format!("expected AP-24092611, got {latest}"));
    }
    Ok(())
}

async fn latest_by_prefix_ignores_other_days_and_categories<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-a", "AP-24092605", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_record(make_application("rec-b", "AP-24092709", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_record(make_record(
        "rec-c",
        Some("TK-24092608"),
        visaflow_core::RecordKind::Ticket,
        "student-1",
        "2024-09-26T10:00:00Z",
    ))
    .await
    .map_err(|e| e.to_string())?;

    let latest = s
        .find_latest_by_prefix("AP-240926")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("expected a latest identifier")?;
    if latest.to_string() != "AP-24092605" {
        return Err(format!("expected AP-24092605, got {latest}"));
    }
    match s.find_latest_by_prefix("AG-240926").await {
        Ok(None) => Ok(()),
        other => Err(format!("expected no AG identifiers, got {other:?}")),
    }
}

// ── Reservation ───────────────────────────────────────────────────────────────

async fn first_reservation_is_one<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s
        .reserve_sequence(day_key(Category::Application))
        .await
        .map_err(|e| e.to_string())?;
    if first != 1 {
        return Err(format!("expected 1, got {first}"));
    }
    Ok(())
}

async fn reservations_are_sequential<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let key = day_key(Category::Ticket);
    for expected in 1..=10u32 {
        let got = s.reserve_sequence(key).await.map_err(|e| e.to_string())?;
        if got != expected {
            return Err(format!("reservation {expected} returned {got}"));
        }
    }
    Ok(())
}

async fn keys_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let app = day_key(Category::Application);
    let next_day = SequenceKey::new(
        Category::Application,
        DateStamp::from_date(time::macros::date!(2024 - 09 - 27)),
    );
    for _ in 0..3 {
        s.reserve_sequence(app).await.map_err(|e| e.to_string())?;
    }
    let agent = s
        .reserve_sequence(day_key(Category::Agent))
        .await
        .map_err(|e| e.to_string())?;
    let tomorrow = s
        .reserve_sequence(next_day)
        .await
        .map_err(|e| e.to_string())?;
    if agent != 1 || tomorrow != 1 {
        return Err(format!(
            "expected fresh counters, got agent={agent} next_day={tomorrow}"
        ));
    }
    Ok(())
}

/// Records created before any reservation push the counter forward.
async fn reservation_seeded_from_stored_identifiers<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-1", "AP-24092601", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_record(make_application("rec-7", "AP-24092607", "student-1"))
        .await
        .map_err(|e| e.to_string())?;

    let next = s
        .reserve_sequence(day_key(Category::Application))
        .await
        .map_err(|e| e.to_string())?;
    if next != 8 {
        return Err(format!("expected 8, got {next}"));
    }
    Ok(())
}

/// A record written with a sequence ahead of the counter is not handed out again.
async fn reservation_catches_up_with_later_records<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let key = day_key(Category::Application);
    s.reserve_sequence(key).await.map_err(|e| e.to_string())?;
    s.create_record(make_application("rec-5", "AP-24092605", "student-1"))
        .await
        .map_err(|e| e.to_string())?;

    let next = s.reserve_sequence(key).await.map_err(|e| e.to_string())?;
    if next != 6 {
        return Err(format!("expected 6, got {next}"));
    }
    Ok(())
}

async fn reservation_continues_past_99<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create_record(make_application("rec-99", "AP-24092699", "student-1"))
        .await
        .map_err(|e| e.to_string())?;
    let key = day_key(Category::Application);
    let first = s.reserve_sequence(key).await.map_err(|e| e.to_string())?;
    let second = s.reserve_sequence(key).await.map_err(|e| e.to_string())?;
    if (first, second) != (100, 101) {
        return Err(format!("expected (100, 101), got ({first}, {second})"));
    }
    Ok(())
}
