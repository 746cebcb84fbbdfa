pub(crate) mod agents;
pub(crate) mod catalog;
pub(crate) mod chat;
pub(crate) mod health;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

/// `{ "error": msg }` with the given status.
pub(crate) fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": msg.into() }))).into_response()
}
