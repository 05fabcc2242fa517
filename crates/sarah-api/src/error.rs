use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sarah_extract::ExtractError;
use sarah_gateway::GatewayError;
use sarah_types::api::ErrorResponse;
use thiserror::Error;

/// Request-level failures. Persistence failures never appear here — the
/// stores log and swallow them by design.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("conversation not found")]
    ConversationNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error("a response is already being generated")]
    StreamBusy,
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ConversationNotFound | ApiError::MessageNotFound => StatusCode::NOT_FOUND,
            ApiError::StreamBusy => StatusCode::CONFLICT,
            ApiError::Extract(ExtractError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Extract(ExtractError::UnsupportedFormat) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Gateway(GatewayError::MissingImage) => StatusCode::BAD_REQUEST,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_failure_class_maps_to_its_status() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ConversationNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::StreamBusy.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Extract(ExtractError::TooLarge).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Extract(ExtractError::UnsupportedFormat).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::Extract(ExtractError::EmptyContent).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Gateway(GatewayError::Parse("x".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
