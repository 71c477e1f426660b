use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use contextor::ChatSession;
use tracing::{debug, error};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::{
        chat::get_response_request::{GetResponseRequest, GetResponseResponse},
        request_id,
    },
};

/// Answers one question in the persona's voice.
///
/// Empty or whitespace-only questions are rejected with `400 BAD_REQUEST`
/// before any retrieval: they would embed to a meaningless query vector.
/// Any other string is accepted verbatim.
pub async fn get_response_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GetResponseRequest>, JsonRejection>,
) -> AppResult<Json<GetResponseResponse>> {
    let request_id = request_id(&headers);
    let Json(p) = payload?;

    if p.question.trim().is_empty() {
        return Err(AppError::BadRequest("question must not be empty".into()));
    }

    debug!(
        request_id = %request_id,
        question_len = p.question.len(),
        "get_response_route: start"
    );

    let turn = ChatSession::respond(&state.chat, &p.question)
        .await
        .map_err(|err| {
            error!(request_id = %request_id, error = %err, "get_response_route: chat failed");
            AppError::Chat(err)
        })?;

    debug!(
        request_id = %request_id,
        blocks = turn.retrieved_context.len(),
        "get_response_route: success"
    );

    Ok(Json(GetResponseResponse {
        retrieved_docs: turn.retrieved_context,
        response: turn.response,
    }))
}
