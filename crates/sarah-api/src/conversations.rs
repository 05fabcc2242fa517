use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use sarah_types::api::RenameConversationRequest;
use sarah_types::models::{Conversation, Language};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub language: Language,
}

/// POST /conversations — new empty conversation at the front of the list.
pub async fn create_conversation(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let id = state.history.create_conversation(query.language);
    let conversation = state
        .history
        .get(&id)
        .ok_or(ApiError::ConversationNotFound)?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn list_conversations(State(state): State<AppState>) -> Json<Vec<Conversation>> {
    Json(state.history.conversations())
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    state
        .history
        .get(&id)
        .map(Json)
        .ok_or(ApiError::ConversationNotFound)
}

pub async fn rename_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameConversationRequest>,
) -> Result<StatusCode, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title required".to_string()));
    }
    if state.history.get(&id).is_none() {
        return Err(ApiError::ConversationNotFound);
    }
    state.history.rename_conversation(&id, &req.title);
    Ok(StatusCode::NO_CONTENT)
}

/// Deleting an absent conversation is a no-op, not an error.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    state.history.delete_conversation(&id);
    StatusCode::NO_CONTENT
}
