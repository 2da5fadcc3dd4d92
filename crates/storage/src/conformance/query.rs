use std::future::Future;

use visaflow_core::{OfferLetterStatus, RecordKind, SectionName, SectionStatus};

use super::{make_application, make_record, party, TestResult};
use crate::record::RecordFilter;
use crate::RecordStore;

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "query",
        "list_empty_store",
        list_empty_store(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "list_orders_by_created_at",
        list_orders_by_created_at(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "list_filters_by_kind",
        list_filters_by_kind(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "list_filters_by_owner",
        list_filters_by_owner(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "list_filters_by_party_includes_linked_agent",
        list_filters_by_party_includes_linked_agent(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "list_filters_by_section_status",
        list_filters_by_section_status(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "list_respects_limit",
        list_respects_limit(factory).await,
    ));

    results
}

/// Three applications for two students and one ticket, created in order.
async fn seed<S: RecordStore>(s: &S) -> Result<(), String> {
    let records = [
        make_record(
            "rec-c",
            Some("AP-24092601"),
            RecordKind::Application,
            "student-1",
            "2024-09-26T10:00:00Z",
        ),
        make_record(
            "rec-a",
            Some("AP-24092602"),
            RecordKind::Application,
            "student-2",
            "2024-09-26T11:00:00Z",
        ),
        make_record(
            "rec-b",
            Some("TK-24092601"),
            RecordKind::Ticket,
            "student-1",
            "2024-09-26T12:00:00Z",
        ),
        make_record(
            "rec-d",
            Some("AP-24092603"),
            RecordKind::Application,
            "student-1",
            "2024-09-26T13:00:00Z",
        ),
    ];
    for record in records {
        let id = record.id.clone();
        s.create_record(record)
            .await
            .map_err(|e| format!("seed {id}: {e}"))?;
    }
    Ok(())
}

fn ids(records: &[crate::WorkflowRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

async fn list_empty_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let all = s
        .list_records(&RecordFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    if !all.is_empty() {
        return Err(format!("expected no records, got {}", all.len()));
    }
    Ok(())
}

async fn list_orders_by_created_at<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;
    let all = s
        .list_records(&RecordFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    let got = ids(&all);
    if got != ["rec-c", "rec-a", "rec-b", "rec-d"] {
        return Err(format!("unexpected order {got:?}"));
    }
    Ok(())
}

async fn list_filters_by_kind<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;
    let tickets = s
        .list_records(&RecordFilter {
            kind: Some(RecordKind::Ticket),
            ..RecordFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&tickets) != ["rec-b"] {
        return Err(format!("expected only rec-b, got {:?}", ids(&tickets)));
    }
    Ok(())
}

async fn list_filters_by_owner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;
    let owned = s
        .list_records(&RecordFilter {
            owner_id: Some("student-1".to_string()),
            kind: Some(RecordKind::Application),
            ..RecordFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&owned) != ["rec-c", "rec-d"] {
        return Err(format!("expected rec-c, rec-d, got {:?}", ids(&owned)));
    }
    Ok(())
}

async fn list_filters_by_party_includes_linked_agent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;
    let mut linked = make_application("rec-e", "AP-24092604", "student-3");
    linked.agent = Some(party("agent-1"));
    s.create_record(linked).await.map_err(|e| e.to_string())?;
    s.create_record(make_record(
        "rec-f",
        Some("AG-24092601"),
        RecordKind::Agent,
        "agent-1",
        "2024-09-26T14:00:00Z",
    ))
    .await
    .map_err(|e| e.to_string())?;

    let visible = s
        .list_records(&RecordFilter {
            party_id: Some("agent-1".to_string()),
            ..RecordFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    let mut got = ids(&visible);
    got.sort_unstable();
    if got != ["rec-e", "rec-f"] {
        return Err(format!("expected rec-e, rec-f, got {got:?}"));
    }
    Ok(())
}

async fn list_filters_by_section_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;
    let mut record = s.find_by_id("rec-a").await.map_err(|e| e.to_string())?;
    let approved = SectionStatus::OfferLetter(OfferLetterStatus::Approved);
    record
        .sections
        .get_mut(SectionName::OfferLetter)
        .ok_or("rec-a has no offerLetter section")?
        .status = approved;
    s.save(record).await.map_err(|e| e.to_string())?;

    let matching = s
        .list_records(&RecordFilter {
            section_status: Some(approved),
            ..RecordFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&matching) != ["rec-a"] {
        return Err(format!("expected only rec-a, got {:?}", ids(&matching)));
    }

    // Tickets have no offerLetter section, so they never match.
    let under_review = s
        .list_records(&RecordFilter {
            section_status: Some(SectionStatus::OfferLetter(OfferLetterStatus::UnderReview)),
            ..RecordFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&under_review) != ["rec-c", "rec-d"] {
        return Err(format!("expected rec-c, rec-d, got {:?}", ids(&under_review)));
    }
    Ok(())
}

async fn list_respects_limit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s).await?;
    let first_two = s
        .list_records(&RecordFilter {
            limit: 2,
            ..RecordFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&first_two) != ["rec-c", "rec-a"] {
        return Err(format!("expected rec-c, rec-a, got {:?}", ids(&first_two)));
    }
    Ok(())
}
