//! Bridges the gateway's fragment stream into conversation-store
//! mutations while re-emitting each fragment for the HTTP response body.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, pin_mut};
use sarah_gateway::GatewayError;
use sarah_store::{ConversationStore, MessageUpdate};
use sarah_types::models::Language;
use tokio::sync::OwnedSemaphorePermit;
use tracing::warn;

/// The message a failed generation leaves behind in place of the partial
/// answer.
pub fn failure_message(language: Language, detail: &str) -> String {
    format!("**{}:** {}", language.error_title(), detail)
}

/// Drive `upstream` to completion, applying fragments strictly in arrival
/// order — one store append per fragment, no coalescing.
///
/// A producer error overwrites the partial answer with the failure message
/// and stops reading. The permit is released when the returned stream is
/// dropped, whatever the outcome. `deferred_title` (the first-exchange
/// auto-title) is applied only after normal completion.
pub fn relay(
    history: Arc<ConversationStore>,
    conversation_id: String,
    language: Language,
    upstream: impl Stream<Item = Result<String, GatewayError>> + Send + 'static,
    permit: OwnedSemaphorePermit,
    deferred_title: Option<String>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    async_stream::stream! {
        let _permit = permit;
        pin_mut!(upstream);

        while let Some(next) = upstream.next().await {
            match next {
                Ok(fragment) => {
                    history.append_fragment(&conversation_id, &fragment);
                    yield Ok::<_, std::io::Error>(Bytes::from(fragment));
                }
                Err(err) => {
                    warn!("Generation stream failed: {}", err);
                    history.update_last_message(
                        &conversation_id,
                        MessageUpdate::SetContent(failure_message(language, &err.to_string())),
                    );
                    return;
                }
            }
        }

        if let Some(title) = deferred_title {
            history.rename_conversation(&conversation_id, &title);
        }
    }
}
