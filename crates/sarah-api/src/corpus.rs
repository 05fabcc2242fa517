use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use sarah_types::api::AddDocumentRequest;
use sarah_types::models::CorpusDocument;

use crate::AppState;
use crate::error::ApiError;

pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<CorpusDocument>> {
    Json(state.corpus.documents())
}

/// Emptiness is rejected here, at the caller layer — the store itself
/// accepts whatever it is handed.
pub async fn add_document(
    State(state): State<AppState>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<(StatusCode, Json<CorpusDocument>), ApiError> {
    if req.name.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "document name and content required".to_string(),
        ));
    }
    let document = state.corpus.add_document(&req.name, &req.content);
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn delete_document(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.corpus.delete_document(&id);
    StatusCode::NO_CONTENT
}
