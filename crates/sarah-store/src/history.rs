use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use sarah_types::models::{
    Attachment, ChatMessage, Conversation, FeedbackState, Language, MessageRole, QuizData,
};
use tracing::{error, warn};

use crate::blob::{BlobStore, HISTORY_KEY};
use crate::new_id;

/// Tagged update applied to the last message of a conversation. Keeps the
/// mutation intent explicit instead of merging open-ended partial records.
#[derive(Debug, Clone)]
pub enum MessageUpdate {
    SetContent(String),
    AttachQuiz(QuizData),
}

/// Ordered collection of conversations with write-through persistence.
///
/// Every mutation rewrites the full collection blob. Writes are best
/// effort: a failed write is logged, flips the health flag, and the store
/// keeps serving from memory for the rest of the session.
pub struct ConversationStore {
    blob: Arc<BlobStore>,
    inner: Mutex<Vec<Conversation>>,
    persist_ok: AtomicBool,
}

impl ConversationStore {
    /// Restore the collection from storage. A missing or unreadable blob
    /// falls back to a fresh store seeded with one empty conversation, so
    /// callers never observe a store with nothing to select.
    pub fn load(blob: Arc<BlobStore>, language: Language) -> Self {
        let restored: Option<Vec<Conversation>> = match blob.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(list) => Some(list),
                Err(e) => {
                    warn!("Discarding unreadable chat history: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load chat history: {}", e);
                None
            }
        };

        let seed = restored.is_none();
        let store = Self {
            blob,
            inner: Mutex::new(restored.unwrap_or_default()),
            persist_ok: AtomicBool::new(true),
        };
        if seed {
            store.create_conversation(language);
        }
        store
    }

    /// Insert a new conversation at the front and return its id.
    pub fn create_conversation(&self, language: Language) -> String {
        let conversation = Conversation {
            id: new_id(),
            title: language.default_conversation_title().to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        };
        let id = conversation.id.clone();
        let mut inner = self.lock();
        inner.insert(0, conversation);
        self.persist(&inner);
        id
    }

    pub fn delete_conversation(&self, id: &str) {
        let mut inner = self.lock();
        let before = inner.len();
        inner.retain(|c| c.id != id);
        if inner.len() != before {
            self.persist(&inner);
        }
    }

    pub fn rename_conversation(&self, id: &str, title: &str) {
        let mut inner = self.lock();
        let Some(conversation) = inner.iter_mut().find(|c| c.id == id) else {
            return;
        };
        conversation.title = title.to_string();
        self.persist(&inner);
    }

    /// Append a message with a freshly generated id. Returns the new
    /// message id, or `None` when the conversation does not exist.
    pub fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Option<String> {
        let mut inner = self.lock();
        let conversation = inner.iter_mut().find(|c| c.id == conversation_id)?;
        let message = ChatMessage {
            id: new_id(),
            role,
            content: content.to_string(),
            attachment,
            quiz: None,
            feedback: None,
        };
        let id = message.id.clone();
        conversation.messages.push(message);
        self.persist(&inner);
        Some(id)
    }

    /// Fragment accumulation while a stream is in flight: appends to the
    /// last message's content only while that message is the assistant's.
    pub fn append_fragment(&self, conversation_id: &str, fragment: &str) {
        let mut inner = self.lock();
        let Some(conversation) = inner.iter_mut().find(|c| c.id == conversation_id) else {
            return;
        };
        match conversation.messages.last_mut() {
            Some(last) if last.role == MessageRole::Assistant => last.content.push_str(fragment),
            _ => return,
        }
        self.persist(&inner);
    }

    /// Apply a tagged update to the last message of the conversation.
    /// No-op when the conversation is absent or has no messages.
    pub fn update_last_message(&self, conversation_id: &str, update: MessageUpdate) {
        let mut inner = self.lock();
        let Some(conversation) = inner.iter_mut().find(|c| c.id == conversation_id) else {
            return;
        };
        let Some(last) = conversation.messages.last_mut() else {
            return;
        };
        match update {
            MessageUpdate::SetContent(content) => last.content = content,
            MessageUpdate::AttachQuiz(quiz) => last.quiz = Some(quiz),
        }
        self.persist(&inner);
    }

    /// Set feedback on one message. Re-applying the value already present
    /// clears it; a different value overwrites. Returns the state after the
    /// call.
    pub fn update_message_feedback(
        &self,
        conversation_id: &str,
        message_id: &str,
        feedback: FeedbackState,
    ) -> Option<FeedbackState> {
        let mut inner = self.lock();
        let conversation = inner.iter_mut().find(|c| c.id == conversation_id)?;
        let message = conversation.messages.iter_mut().find(|m| m.id == message_id)?;
        message.feedback = if message.feedback == Some(feedback) {
            None
        } else {
            Some(feedback)
        };
        let result = message.feedback;
        self.persist(&inner);
        result
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Conversation> {
        self.lock().iter().find(|c| c.id == id).cloned()
    }

    /// Health signal for the write-through policy: `false` after the most
    /// recent persist attempt failed.
    pub fn last_persist_succeeded(&self) -> bool {
        self.persist_ok.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Conversation>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, conversations: &[Conversation]) {
        let result = serde_json::to_string(conversations)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.blob.put(HISTORY_KEY, &raw));
        match result {
            Ok(()) => self.persist_ok.store(true, Ordering::Relaxed),
            Err(e) => {
                error!("Failed to save chat history: {}", e);
                self.persist_ok.store(false, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, ConversationStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob = Arc::new(BlobStore::open(&dir.path().join("sarah.db")).expect("open"));
        let store = ConversationStore::load(blob, Language::Fr);
        (dir, store)
    }

    #[test]
    fn empty_storage_seeds_one_conversation() {
        let (_dir, store) = open_store();
        let conversations = store.conversations();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "Nouvelle Conversation");
        assert!(conversations[0].messages.is_empty());
    }

    #[test]
    fn create_inserts_at_front_with_a_fresh_id() {
        let (_dir, store) = open_store();
        let existing: Vec<String> = store.conversations().iter().map(|c| c.id.clone()).collect();

        let id = store.create_conversation(Language::Ar);
        assert!(!existing.contains(&id));

        let conversations = store.conversations();
        assert_eq!(conversations[0].id, id);
        assert_eq!(conversations[0].title, "محادثة جديدة");
    }

    #[test]
    fn fragments_concatenate_in_call_order() {
        let (_dir, store) = open_store();
        let id = store.create_conversation(Language::Fr);

        store.add_message(&id, MessageRole::User, "2 + 2 ?", None);
        store.add_message(&id, MessageRole::Assistant, "", None);
        store.append_fragment(&id, "La réponse ");
        store.append_fragment(&id, "est ");
        store.append_fragment(&id, "4.");

        let conversation = store.get(&id).expect("conversation");
        assert_eq!(conversation.messages.last().expect("message").content, "La réponse est 4.");
    }

    #[test]
    fn fragment_is_dropped_when_the_tail_is_not_the_assistant() {
        let (_dir, store) = open_store();
        let id = store.create_conversation(Language::Fr);

        store.add_message(&id, MessageRole::Assistant, "", None);
        store.append_fragment(&id, "avant");
        store.add_message(&id, MessageRole::User, "interruption", None);
        store.append_fragment(&id, " après");

        let conversation = store.get(&id).expect("conversation");
        assert_eq!(conversation.messages[0].content, "avant");
        assert_eq!(conversation.messages[1].content, "interruption");
    }

    #[test]
    fn feedback_toggles_on_repeat_and_overwrites_on_change() {
        let (_dir, store) = open_store();
        let id = store.create_conversation(Language::Fr);
        let message_id = store
            .add_message(&id, MessageRole::Assistant, "voilà", None)
            .expect("message id");

        assert_eq!(
            store.update_message_feedback(&id, &message_id, FeedbackState::Liked),
            Some(FeedbackState::Liked)
        );
        assert_eq!(
            store.update_message_feedback(&id, &message_id, FeedbackState::Liked),
            None
        );
        assert_eq!(
            store.update_message_feedback(&id, &message_id, FeedbackState::Liked),
            Some(FeedbackState::Liked)
        );
        assert_eq!(
            store.update_message_feedback(&id, &message_id, FeedbackState::Disliked),
            Some(FeedbackState::Disliked)
        );
    }

    #[test]
    fn update_last_message_attaches_quiz_and_overwrites_content() {
        let (_dir, store) = open_store();
        let id = store.create_conversation(Language::Fr);
        store.add_message(&id, MessageRole::Assistant, "partiel", None);

        let quiz = QuizData {
            title: "Fractions".into(),
            questions: vec![],
        };
        store.update_last_message(&id, MessageUpdate::AttachQuiz(quiz.clone()));
        store.update_last_message(&id, MessageUpdate::SetContent("final".into()));

        let last = store.get(&id).expect("conversation").messages.pop().expect("message");
        assert_eq!(last.quiz, Some(quiz));
        assert_eq!(last.content, "final");
    }

    #[test]
    fn mutations_on_an_absent_conversation_are_no_ops() {
        let (_dir, store) = open_store();
        let before = store.conversations();

        store.rename_conversation("missing", "titre");
        store.delete_conversation("missing");
        store.append_fragment("missing", "x");
        assert_eq!(store.add_message("missing", MessageRole::User, "x", None), None);

        assert_eq!(store.conversations(), before);
    }

    #[test]
    fn reload_reproduces_the_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sarah.db");

        let blob = Arc::new(BlobStore::open(&path).expect("open"));
        let store = ConversationStore::load(blob, Language::Fr);
        let id = store.create_conversation(Language::Fr);
        store.add_message(&id, MessageRole::User, "bonjour", None);
        store.add_message(&id, MessageRole::Assistant, "salut", None);
        store.rename_conversation(&id, "premier échange");
        let saved = store.conversations();
        drop(store);

        let blob = Arc::new(BlobStore::open(&path).expect("reopen"));
        let reloaded = ConversationStore::load(blob, Language::Fr);
        assert_eq!(reloaded.conversations(), saved);
        assert!(reloaded.last_persist_succeeded());
    }
}
