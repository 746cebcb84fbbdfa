use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use super::error_response;
use crate::models::AVAILABLE_MODELS;
use crate::tools::calc;

/// `GET /api/models`
pub(crate) async fn api_models() -> impl IntoResponse {
    Json(serde_json::json!({
        "default": crate::models::DEFAULT_MODEL,
        "models": AVAILABLE_MODELS,
    }))
}

/// `GET /api/tools`
pub(crate) async fn api_tools() -> impl IntoResponse {
    Json(serde_json::json!({ "tools": crate::tools::list_tools() }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalcRequest {
    expression: String,
}

/// `POST /api/calc` — evaluate an expression.
///
/// `result` is the calculator's display text; `value` is the formatted
/// number, or absent on failure.
pub(crate) async fn api_calc(Json(body): Json<CalcRequest>) -> impl IntoResponse {
    if body.expression.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "expression is empty");
    }
    let expression = body.expression.trim();
    let outcome = calc::evaluate(expression);
    Json(serde_json::json!({
        "result": calc::render(expression, &outcome),
        "value": outcome.ok().map(calc::format_number),
    }))
    .into_response()
}
