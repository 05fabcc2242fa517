use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use sarah_store::MessageUpdate;
use sarah_types::api::{ActionRequest, ChatAction, CreateQuizRequest, SendMessageRequest};
use sarah_types::models::{Attachment, AttachmentKind, MessageRole, QuizData};

use crate::error::ApiError;
use crate::{AppState, assembler};

/// Title derived from the first exchange: the message text, or the
/// attachment name when the message is blank. Capped at 40 characters
/// (char-safe, the titles are frequently Arabic).
fn auto_title(message: &str, attachment: Option<&Attachment>) -> Option<String> {
    let source = if message.trim().is_empty() {
        attachment.map(|a| a.name.as_str()).unwrap_or_default()
    } else {
        message
    };
    if source.is_empty() {
        return None;
    }
    if source.chars().count() > 40 {
        let head: String = source.chars().take(40).collect();
        Some(format!("{head}..."))
    } else {
        Some(source.to_string())
    }
}

/// Recover the image media type from the preview data URL; the extraction
/// pipeline always records one for images.
fn image_mime(attachment: &Attachment) -> String {
    attachment
        .preview_url
        .as_deref()
        .and_then(|url| url.strip_prefix("data:"))
        .and_then(|rest| rest.split(';').next())
        .unwrap_or("image/webp")
        .to_string()
}

/// POST /conversations/{id}/messages — append the user message, open an
/// assistant message, and stream the generated answer back while the
/// assembler accumulates it into the store.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    if req.message.trim().is_empty() && req.attachment.is_none() {
        return Err(ApiError::Validation(
            "message or attachment required".to_string(),
        ));
    }
    let conversation = state
        .history
        .get(&conversation_id)
        .ok_or(ApiError::ConversationNotFound)?;
    let permit = state.stream_gate.try_begin().ok_or(ApiError::StreamBusy)?;

    let image = req
        .attachment
        .as_ref()
        .filter(|a| a.kind == AttachmentKind::Image);
    let action_request = ActionRequest {
        action: if image.is_some() {
            ChatAction::ExplainImage
        } else {
            ChatAction::Solve
        },
        language: req.language,
        prompt: req.message.clone(),
        corpus_content: state.corpus.grounding_context(),
        file_content: req
            .attachment
            .as_ref()
            .filter(|a| a.kind == AttachmentKind::Document)
            .map(|a| a.content.clone()),
        image_base64: image.map(|a| a.content.clone()),
        mime_type: image.map(image_mime),
        level: None,
        num_questions: None,
    };

    // Judged against the pre-send snapshot (first exchange only), applied
    // after the stream completes.
    let deferred_title = (conversation.messages.len() <= 1)
        .then(|| auto_title(&req.message, req.attachment.as_ref()))
        .flatten();

    state
        .history
        .add_message(&conversation_id, MessageRole::User, &req.message, req.attachment.clone());
    state
        .history
        .add_message(&conversation_id, MessageRole::Assistant, "", None);

    match state.gateway.stream_generate(&action_request).await {
        Ok(upstream) => {
            let body = Body::from_stream(assembler::relay(
                state.history.clone(),
                conversation_id,
                req.language,
                upstream,
                permit,
                deferred_title,
            ));
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response())
        }
        Err(err) => {
            state.history.update_last_message(
                &conversation_id,
                MessageUpdate::SetContent(assembler::failure_message(
                    req.language,
                    &err.to_string(),
                )),
            );
            Err(err.into())
        }
    }
}

/// POST /conversations/{id}/quiz — the non-streaming variant: generate
/// first, then record the exchange with the quiz attached wholesale to the
/// assistant message. A failed generation leaves the conversation intact.
pub async fn create_quiz(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<CreateQuizRequest>,
) -> Result<Json<QuizData>, ApiError> {
    if req.topic.trim().is_empty() {
        return Err(ApiError::Validation("quiz topic required".to_string()));
    }
    state
        .history
        .get(&conversation_id)
        .ok_or(ApiError::ConversationNotFound)?;

    let action_request = ActionRequest {
        action: ChatAction::GenerateQuiz,
        language: req.language,
        prompt: req.topic.clone(),
        corpus_content: state.corpus.grounding_context(),
        file_content: None,
        image_base64: None,
        mime_type: None,
        level: Some(req.level.clone()),
        num_questions: Some(req.num_questions),
    };

    let quiz = state.gateway.generate_quiz(&action_request).await?;

    state
        .history
        .add_message(&conversation_id, MessageRole::User, &req.topic, None);
    state
        .history
        .add_message(&conversation_id, MessageRole::Assistant, "", None);
    state
        .history
        .update_last_message(&conversation_id, MessageUpdate::AttachQuiz(quiz.clone()));
    state.history.rename_conversation(
        &conversation_id,
        &req.language.quiz_conversation_title(&req.topic),
    );

    Ok(Json(quiz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_pass_through_unchanged() {
        assert_eq!(auto_title("2 + 2 ?", None).as_deref(), Some("2 + 2 ?"));
    }

    #[test]
    fn long_titles_are_cut_at_forty_chars_with_an_ellipsis() {
        let message = "x".repeat(50);
        let title = auto_title(&message, None).expect("title");
        assert_eq!(title, format!("{}...", "x".repeat(40)));
    }

    #[test]
    fn arabic_titles_truncate_on_char_boundaries() {
        let message = "سؤال".repeat(20);
        let title = auto_title(&message, None).expect("title");
        assert_eq!(title.chars().count(), 43);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn blank_message_falls_back_to_the_attachment_name() {
        let attachment = Attachment {
            name: "devoir.pdf".into(),
            kind: AttachmentKind::Document,
            preview_url: None,
            content: "…".into(),
        };
        assert_eq!(auto_title("  ", Some(&attachment)).as_deref(), Some("devoir.pdf"));
        assert_eq!(auto_title("  ", None), None);
    }

    #[test]
    fn image_mime_comes_from_the_preview_data_url() {
        let attachment = Attachment {
            name: "photo.png".into(),
            kind: AttachmentKind::Image,
            preview_url: Some("data:image/png;base64,AAAA".into()),
            content: "AAAA".into(),
        };
        assert_eq!(image_mime(&attachment), "image/png");

        let bare = Attachment {
            preview_url: None,
            ..attachment
        };
        assert_eq!(image_mime(&bare), "image/webp");
    }
}
