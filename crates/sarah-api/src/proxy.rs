use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;

use sarah_types::api::{ActionRequest, ChatAction};

use crate::AppState;
use crate::error::ApiError;

/// POST /api/gemini — the stateless proxy surface: one action descriptor
/// in, a fragment stream (or one quiz document) out. No store interaction,
/// no memory of previous calls.
pub async fn invoke(
    State(state): State<AppState>,
    Json(req): Json<ActionRequest>,
) -> Result<Response, ApiError> {
    match req.action {
        ChatAction::GenerateQuiz => {
            let quiz = state.gateway.generate_quiz(&req).await?;
            Ok(Json(quiz).into_response())
        }
        ChatAction::Solve | ChatAction::ExplainImage => {
            let upstream = state.gateway.stream_generate(&req).await?;
            let body = Body::from_stream(upstream.map(|item| {
                item.map(Bytes::from)
                    .map_err(|e| std::io::Error::other(e.to_string()))
            }));
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response())
        }
    }
}
