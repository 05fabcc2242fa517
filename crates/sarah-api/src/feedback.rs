use axum::Json;
use axum::extract::{Path, State};

use sarah_types::api::{FeedbackRequest, FeedbackResponse};

use crate::AppState;
use crate::error::ApiError;

/// POST /conversations/{id}/messages/{message_id}/feedback — toggle
/// semantics: re-sending the value already set clears it, a different
/// value overwrites it. Responds with the state after the call.
pub async fn set_feedback(
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(String, String)>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let conversation = state
        .history
        .get(&conversation_id)
        .ok_or(ApiError::ConversationNotFound)?;
    if !conversation.messages.iter().any(|m| m.id == message_id) {
        return Err(ApiError::MessageNotFound);
    }

    let feedback = state
        .history
        .update_message_feedback(&conversation_id, &message_id, req.feedback);
    Ok(Json(FeedbackResponse { feedback }))
}
