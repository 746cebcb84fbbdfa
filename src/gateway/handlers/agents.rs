use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::warn;

use super::error_response;
use crate::gateway::AppState;
use crate::registry::{SearchFilters, SortOrder};
use crate::store::{AgentDraft, AgentRecord};

/// Query string for `GET /api/agents`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListParams {
    #[serde(default)]
    q: String,
    author: Option<String>,
    model: Option<String>,
    /// Comma-separated tool ids.
    tools: Option<String>,
    sort: Option<String>,
}

impl ListParams {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            author: self.author.clone(),
            model: self.model.clone(),
            tools: self
                .tools
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

fn not_found(id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "agent not found", "id": id })),
    )
        .into_response()
}

fn invalid_draft(draft: &AgentDraft) -> Option<axum::response::Response> {
    let missing = draft.missing_fields();
    if missing.is_empty() {
        return None;
    }
    Some(
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("missing required fields: {}", missing.join(", ")),
                "missing": missing,
            })),
        )
            .into_response(),
    )
}

/// `GET /api/agents` — search, filter and sort.
pub(crate) async fn api_agents_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let order = match params.sort.as_deref().unwrap_or_default().parse::<SortOrder>() {
        Ok(o) => o,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    let filters = params.filters();
    let agents = state
        .registry
        .browse(params.q.trim(), Some(&filters), order)
        .await;
    Json(serde_json::json!({ "agents": agents })).into_response()
}

/// `POST /api/agents` — create from a draft.
pub(crate) async fn api_agent_create(
    State(state): State<AppState>,
    Json(draft): Json<AgentDraft>,
) -> impl IntoResponse {
    if let Some(resp) = invalid_draft(&draft) {
        return resp;
    }
    match state.registry.create(draft).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => {
            warn!(error = %e, "create agent failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

/// `GET /api/agents/:id`
pub(crate) async fn api_agent_get(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get_by_id(&agent_id).await {
        Some(record) => Json(record).into_response(),
        None => not_found(&agent_id),
    }
}

/// `PUT /api/agents/:id` — replace a record.  `id` and `created_at` in
/// the body are ignored.
pub(crate) async fn api_agent_update(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(record): Json<AgentRecord>,
) -> impl IntoResponse {
    if let Some(resp) = invalid_draft(&record.to_draft()) {
        return resp;
    }
    match state.registry.update(&agent_id, record).await {
        Ok(true) => match state.registry.get_by_id(&agent_id).await {
            Some(updated) => Json(updated).into_response(),
            None => not_found(&agent_id),
        },
        Ok(false) => not_found(&agent_id),
        Err(e) => {
            warn!(id = %agent_id, error = %e, "update agent failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

/// `DELETE /api/agents/:id`
pub(crate) async fn api_agent_delete(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.delete(&agent_id).await {
        Ok(true) => Json(serde_json::json!({ "deleted": true, "id": agent_id })).into_response(),
        Ok(false) => not_found(&agent_id),
        Err(e) => {
            warn!(id = %agent_id, error = %e, "delete agent failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

/// `GET /api/agents/by-name/:name`
pub(crate) async fn api_agent_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.get_by_name(&name).await {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "agent not found", "name": name })),
        )
            .into_response(),
    }
}

/// `GET /api/agents/:id/clone` — editable draft prefilled from a record.
pub(crate) async fn api_agent_clone(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.clone_template(&agent_id).await {
        Some(draft) => Json(draft).into_response(),
        None => not_found(&agent_id),
    }
}

/// `GET /api/authors`
pub(crate) async fn api_authors(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "authors": state.registry.authors().await }))
}

/// `GET /api/stats`
pub(crate) async fn api_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.stats().await)
}
