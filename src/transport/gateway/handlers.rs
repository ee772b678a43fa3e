use crate::diagnostics::health;
use crate::error::{ExecutorError, JudgeError};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use super::auth::is_authorized;
use super::{AppState, ExecuteBody, JudgeBody};

fn unauthorized_response() -> Response {
    let rejection = ExecutorError::Unauthorized;
    let status =
        StatusCode::from_u16(rejection.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
    (
        status,
        Json(serde_json::json!({"error": rejection.to_string()})),
    )
        .into_response()
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(serde_json::json!({"success": false, "error": error.to_string()})),
    )
        .into_response()
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting malformed request body");
        error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
    })
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if is_authorized(headers, state.internal_token.as_deref()) {
        Ok(())
    } else {
        tracing::warn!("rejected request with missing or invalid bearer token");
        Err(unauthorized_response())
    }
}

/// GET /health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(health::snapshot_json())
}

/// POST /scheduler: run one dispatcher cycle
pub(super) async fn handle_scheduler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    match state.dispatcher.run_cycle(Utc::now()).await {
        Ok(reports) if reports.is_empty() => Json(serde_json::json!({
            "success": true,
            "message": "No jobs due",
            "processed": [],
        }))
        .into_response(),
        Ok(reports) => Json(serde_json::json!({
            "success": true,
            "processed": reports,
        }))
        .into_response(),
        Err(error) => {
            tracing::error!(error = %error, "dispatcher cycle failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error)
        }
    }
}

/// POST /executor: acknowledge once the job's lock outcome is known
pub(super) async fn handle_executor(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let request: ExecuteBody = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.executor.execute(&request.job_id).await {
        Ok(ack) => Json(ack).into_response(),
        Err(error) => {
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            tracing::warn!(job_id = %request.job_id, status = status.as_u16(), error = %error, "execution rejected");
            error_response(status, error)
        }
    }
}

/// POST /judge: start grading a recorded run
pub(super) async fn handle_judge(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let request: JudgeBody = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.judge.dispatch(&request.run_id).await {
        Ok(ack) => Json(ack).into_response(),
        Err(error @ JudgeError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, error),
        Err(error) => {
            tracing::error!(run_id = %request.run_id, error = %error, "judge dispatch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error)
        }
    }
}
