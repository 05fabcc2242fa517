pub mod assembler;
pub mod chat;
pub mod conversations;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod proxy;

use std::sync::Arc;

use sarah_gateway::GeminiClient;
use sarah_store::{ConversationStore, CorpusStore};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub history: Arc<ConversationStore>,
    pub corpus: Arc<CorpusStore>,
    pub gateway: GeminiClient,
    pub stream_gate: StreamGate,
}

/// One in-flight generation at a time. The permit lives for the whole
/// relay stream, so completion, failure and client disconnect all release
/// it the same way. Two conversations never stream concurrently.
pub struct StreamGate {
    slot: Arc<Semaphore>,
}

impl StreamGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_begin(&self) -> Option<OwnedSemaphorePermit> {
        self.slot.clone().try_acquire_owned().ok()
    }
}

impl Default for StreamGate {
    fn default() -> Self {
        Self::new()
    }
}
