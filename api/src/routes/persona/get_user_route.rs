use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

/// Response payload for /get_user.
#[derive(Debug, Serialize)]
pub struct GetUserResponse {
    /// Speaker the bot impersonates.
    pub user: String,
    /// Corpus the persona was resolved from.
    pub user_file: String,
}

pub async fn get_user_route(State(state): State<Arc<AppState>>) -> Json<GetUserResponse> {
    Json(GetUserResponse {
        user: state.chat.persona.bot_name.clone(),
        user_file: state.corpus_id.clone(),
    })
}
