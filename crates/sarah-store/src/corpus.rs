use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use sarah_types::models::CorpusDocument;
use tracing::{error, warn};

use crate::blob::{BlobStore, CORPUS_KEY};
use crate::new_id;

/// User-curated reference documents, insertion-ordered, persisted
/// independently of the conversation history under its own storage key.
/// Same write-through best-effort policy as the conversation store.
pub struct CorpusStore {
    blob: Arc<BlobStore>,
    inner: Mutex<Vec<CorpusDocument>>,
    persist_ok: AtomicBool,
}

impl CorpusStore {
    pub fn load(blob: Arc<BlobStore>) -> Self {
        let documents = match blob.get(CORPUS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Discarding unreadable corpus: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load corpus: {}", e);
                Vec::new()
            }
        };
        Self {
            blob,
            inner: Mutex::new(documents),
            persist_ok: AtomicBool::new(true),
        }
    }

    pub fn add_document(&self, name: &str, content: &str) -> CorpusDocument {
        let document = CorpusDocument {
            id: new_id(),
            name: name.to_string(),
            content: content.to_string(),
        };
        let mut inner = self.lock();
        inner.push(document.clone());
        self.persist(&inner);
        document
    }

    pub fn delete_document(&self, id: &str) {
        let mut inner = self.lock();
        let before = inner.len();
        inner.retain(|doc| doc.id != id);
        if inner.len() != before {
            self.persist(&inner);
        }
    }

    pub fn documents(&self) -> Vec<CorpusDocument> {
        self.lock().clone()
    }

    /// Concatenated corpus text injected into outbound prompts, one
    /// delimited block per document in insertion order. `None` when the
    /// corpus is empty — callers branch on presence, never on emptiness.
    pub fn grounding_context(&self) -> Option<String> {
        let inner = self.lock();
        if inner.is_empty() {
            return None;
        }
        Some(
            inner
                .iter()
                .map(|doc| format!("--- Document : {} ---\n{}", doc.name, doc.content))
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }

    pub fn last_persist_succeeded(&self) -> bool {
        self.persist_ok.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CorpusDocument>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, documents: &[CorpusDocument]) {
        let result = serde_json::to_string(documents)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.blob.put(CORPUS_KEY, &raw));
        match result {
            Ok(()) => self.persist_ok.store(true, Ordering::Relaxed),
            Err(e) => {
                error!("Failed to save corpus: {}", e);
                self.persist_ok.store(false, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob = Arc::new(BlobStore::open(&dir.path().join("sarah.db")).expect("open"));
        (dir, CorpusStore::load(blob))
    }

    #[test]
    fn empty_corpus_yields_no_grounding_context() {
        let (_dir, store) = open_store();
        assert_eq!(store.grounding_context(), None);
    }

    #[test]
    fn grounding_context_delimits_each_document() {
        let (_dir, store) = open_store();
        store.add_document("X", "Y");

        let context = store.grounding_context().expect("context");
        assert_eq!(context, "--- Document : X ---\nY");

        store.add_document("Programme M7", "Les fractions.");
        let context = store.grounding_context().expect("context");
        assert!(context.starts_with("--- Document : X ---\nY\n\n"));
        assert!(context.contains("--- Document : Programme M7 ---\nLes fractions."));
    }

    #[test]
    fn delete_removes_only_the_matching_document() {
        let (_dir, store) = open_store();
        let first = store.add_document("a", "1");
        let second = store.add_document("b", "2");

        store.delete_document(&first.id);
        store.delete_document("missing");

        let documents = store.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, second.id);
    }

    #[test]
    fn reload_reproduces_the_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sarah.db");

        let blob = Arc::new(BlobStore::open(&path).expect("open"));
        let store = CorpusStore::load(blob);
        store.add_document("X", "Y");
        let saved = store.documents();
        drop(store);

        let blob = Arc::new(BlobStore::open(&path).expect("reopen"));
        let reloaded = CorpusStore::load(blob);
        assert_eq!(reloaded.documents(), saved);
    }
}
