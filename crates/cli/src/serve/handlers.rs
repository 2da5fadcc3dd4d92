//! HTTP route handlers: health, record creation, reads, transitions and
//! identifier allocation.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;
use visaflow_core::{Category, RecordKind, Role, SectionName, VISAFLOW_VERSION};
use visaflow_engine::{EngineError, TransitionRequest};
use visaflow_storage::{NewRecord, Party, RecordFilter, RecordStore, WorkflowRecord};

use super::error::ApiError;
use super::json_error;
use super::state::{Actor, AppState};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": VISAFLOW_VERSION,
    });
    (StatusCode::OK, Json(response))
}

/// Body of the record creation endpoints.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateRecordBody {
    owner: Party,
    #[serde(default)]
    agent: Option<Party>,
    #[serde(default)]
    details: serde_json::Value,
}

/// POST /applications
pub(crate) async fn handle_create_application(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateRecordBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    create_record(&state, &actor, RecordKind::Application, body?.0).await
}

/// POST /agents
pub(crate) async fn handle_create_agent(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateRecordBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    create_record(&state, &actor, RecordKind::Agent, body?.0).await
}

/// POST /tickets
pub(crate) async fn handle_create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateRecordBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    create_record(&state, &actor, RecordKind::Ticket, body?.0).await
}

/// POST /students
pub(crate) async fn handle_create_student(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateRecordBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    create_record(&state, &actor, RecordKind::Student, body?.0).await
}

async fn create_record(
    state: &AppState,
    actor: &Actor,
    kind: RecordKind,
    body: CreateRecordBody,
) -> Result<(StatusCode, Json<WorkflowRecord>), ApiError> {
    if !actor.role.can_create(kind) {
        return Err(ApiError::forbidden(format!(
            "{} may not create {kind} records",
            actor.role
        )));
    }
    let new = NewRecord {
        kind,
        owner: body.owner,
        agent: body.agent,
        details: body.details,
    };
    let involved = new.owner.id == actor.id || new.agent.as_ref().is_some_and(|a| a.id == actor.id);
    if !actor.role.sees_all_records() && !involved {
        return Err(ApiError::forbidden(
            "records may only be created for yourself or your own students",
        ));
    }

    let record = state
        .allocator
        .create_with_identifier(new, OffsetDateTime::now_utc())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListQuery {
    kind: Option<String>,
    section: Option<String>,
    status: Option<String>,
    #[serde(default)]
    limit: usize,
}

impl ListQuery {
    fn into_filter(self, actor: &Actor) -> Result<RecordFilter, ApiError> {
        let kind = self.kind.as_deref().map(str::parse::<RecordKind>).transpose()?;
        let section_status = match (self.section, self.status) {
            (Some(section), Some(status)) => {
                Some(section.parse::<SectionName>()?.parse_status(&status)?)
            }
            (None, None) => None,
            _ => {
                return Err(ApiError::BadRequest(
                    "section and status must be given together".to_string(),
                ))
            }
        };
        Ok(RecordFilter {
            kind,
            owner_id: None,
            party_id: (!actor.role.sees_all_records()).then(|| actor.id.clone()),
            section_status,
            limit: self.limit,
        })
    }
}

/// GET /records
pub(crate) async fn handle_list_records(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query?.0.into_filter(&actor)?;
    let records = state
        .tracker
        .store()
        .list_records(&filter)
        .await
        .map_err(EngineError::from)?;
    Ok(Json(serde_json::json!({
        "count": records.len(),
        "records": records,
    })))
}

/// GET /records/{id}
pub(crate) async fn handle_get_record(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = visible_record(&state, &actor, &id).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TransitionBody {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// PATCH /records/{id}/sections/{section}
pub(crate) async fn handle_transition(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((id, section)): Path<(String, String)>,
    body: Result<Json<TransitionBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body?.0;
    let section_name: SectionName = section.parse()?;
    if !actor.role.can_transition(section_name) {
        return Err(ApiError::forbidden(format!(
            "{} may not change {section_name} status",
            actor.role
        )));
    }

    let record = visible_record(&state, &actor, &id).await?;

    let mut request =
        TransitionRequest::new(record.id, section, body.status).with_actor(&actor.id);
    if let Some(message) = body.message {
        request = request.with_message(message);
    }
    let outcome = state.tracker.transition(request).await?;
    info!(
        actor = %actor.id,
        id = %outcome.record.id,
        section = %section_name,
        "transition applied"
    );
    Ok(Json(outcome))
}

/// GET /records/{id}/history
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = visible_record(&state, &actor, &id).await?;
    let transitions = state.tracker.history(&record.id).await?;
    Ok(Json(serde_json::json!({
        "id": record.id,
        "identifier": record.identifier,
        "transitions": transitions,
    })))
}

/// POST /identifiers/{category}
pub(crate) async fn handle_allocate_identifier(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if actor.role != Role::Admin {
        return Err(ApiError::forbidden("only admins may allocate bare identifiers"));
    }
    let category: Category = category.parse()?;
    let identifier = state.allocator.allocate_now(category).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "identifier": identifier })),
    ))
}

/// Read a record by id or identifier, if `actor` is allowed to see it.
async fn visible_record(
    state: &AppState,
    actor: &Actor,
    key: &str,
) -> Result<WorkflowRecord, ApiError> {
    let record = state.tracker.record(key).await?;
    if !actor.role.sees_all_records() && !record.involves(&actor.id) {
        return Err(ApiError::forbidden("record belongs to another party"));
    }
    Ok(record)
}
