use axum::Json;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, header};
use serde::Deserialize;
use tracing::error;

use sarah_extract::ExtractError;
use sarah_types::models::Attachment;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ExtractQuery {
    pub filename: String,
}

/// POST /extract?filename=... — raw file bytes in the body, media type in
/// the Content-Type header. Decoding runs off the async runtime.
pub async fn extract_file(
    Query(query): Query<ExtractQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Attachment>, ApiError> {
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let attachment = tokio::task::spawn_blocking(move || {
        sarah_extract::process_file(&query.filename, &mime, &body)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Extract(ExtractError::DecodeFailed)
    })??;

    Ok(Json(attachment))
}
