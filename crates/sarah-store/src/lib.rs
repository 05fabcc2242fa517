pub mod blob;
pub mod corpus;
pub mod history;

pub use blob::BlobStore;
pub use corpus::CorpusStore;
pub use history::{ConversationStore, MessageUpdate};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
