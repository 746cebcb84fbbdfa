use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::warn;

use super::error_response;
use crate::chat::{self, TranscriptMessage};
use crate::gateway::AppState;
use crate::runner::AgentRunner;

#[derive(Debug, Deserialize)]
pub(crate) struct ChatTurnRequest {
    message: String,
    /// Earlier turns of this conversation, oldest first.
    #[serde(default)]
    history: Vec<TranscriptMessage>,
}

/// `POST /api/agents/:id/chat` — one conversational turn.
pub(crate) async fn api_agent_chat(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<ChatTurnRequest>,
) -> impl IntoResponse {
    if body.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message is empty");
    }
    let Some(record) = state.registry.get_by_id(&agent_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "agent not found", "id": agent_id })),
        )
            .into_response();
    };

    let runner = AgentRunner::new(&record, &state.provider, state.workspace.clone());
    let reply = runner.run(&body.message, &body.history).await;

    Json(serde_json::json!({
        "agent": record.name,
        "model": runner.model(),
        "demo": !runner.is_live(),
        "reply": reply,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveChatRequest {
    agent: String,
    #[serde(default)]
    messages: Vec<TranscriptMessage>,
}

/// `POST /api/chats` — persist a transcript snapshot.
pub(crate) async fn api_chat_save(
    State(state): State<AppState>,
    Json(body): Json<SaveChatRequest>,
) -> impl IntoResponse {
    if body.agent.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "agent name is empty");
    }
    match state.chats.save_chat(&body.agent, &body.messages).await {
        Ok(path) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "path": path.to_string_lossy() })),
        )
            .into_response(),
        Err(e) => {
            warn!(agent = %body.agent, error = %e, "save chat failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportChatRequest {
    #[serde(default)]
    agent: String,
    #[serde(default)]
    messages: Vec<TranscriptMessage>,
}

/// `POST /api/chats/export` — transcript as a plain-text download.
pub(crate) async fn api_chat_export(Json(body): Json<ExportChatRequest>) -> impl IntoResponse {
    let stem = if body.agent.trim().is_empty() {
        "chat".to_string()
    } else {
        chat::file_stem(body.agent.trim())
    };
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{stem}.txt\""),
            ),
        ],
        chat::export_text(&body.messages),
    )
}
