//! Transactional scope for the in-memory store.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::types::document::{Document, KEY_FIELD, key_to_string};

use super::MemoryStore;

/// Groups writes so they become visible together on commit.
///
/// Staged documents are invisible to every reader until
/// [`commit_transaction`](Self::commit_transaction) succeeds. Dropping the
/// session without committing discards them.
#[derive(Debug)]
pub struct MemorySession {
    id: Uuid,
    store: MemoryStore,
    staged: BTreeMap<String, Vec<Document>>,
    finished: bool,
}

impl MemorySession {
    pub(crate) fn new(store: MemoryStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            staged: BTreeMap::new(),
            finished: false,
        }
    }

    /// Session identifier, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of writes waiting for commit.
    pub fn pending(&self) -> usize {
        self.staged.values().map(Vec::len).sum()
    }

    pub(crate) fn stage(&mut self, collection: &str, document: Document) -> AppResult<()> {
        self.ensure_open()?;
        let staged = self.staged.entry(collection.to_string()).or_default();
        if let Some(key) = document.get(KEY_FIELD) {
            if staged.iter().any(|d| d.get(KEY_FIELD) == Some(key)) {
                return Err(AppError::conflict(format!(
                    "Duplicate key: _id '{}' already staged in this session",
                    key_to_string(key)
                )));
            }
        }
        staged.push(document);
        Ok(())
    }

    /// Apply every staged write.
    ///
    /// Each collection's batch is checked for key conflicts before anything
    /// in it is stored; a conflict aborts the whole session.
    pub async fn commit_transaction(&mut self) -> AppResult<()> {
        self.ensure_open()?;
        self.finished = true;

        let staged = std::mem::take(&mut self.staged);
        for (collection, documents) in &staged {
            for document in documents {
                if let Some(key) = document.get(KEY_FIELD) {
                    if self.store.contains_key(collection, key) {
                        return Err(AppError::transaction(format!(
                            "Commit aborted: _id '{}' already exists in '{collection}'",
                            key_to_string(key)
                        )));
                    }
                }
            }
        }

        let count: usize = staged.values().map(Vec::len).sum();
        for (collection, documents) in staged {
            self.store.append_all(&collection, documents)?;
        }
        debug!(session = %self.id, writes = count, "Committed memory session");
        Ok(())
    }

    /// Discard every staged write.
    pub async fn abort_transaction(&mut self) -> AppResult<()> {
        self.ensure_open()?;
        self.finished = true;
        let discarded = self.pending();
        self.staged.clear();
        debug!(session = %self.id, discarded, "Aborted memory session");
        Ok(())
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.finished {
            return Err(AppError::transaction(format!(
                "Session {} has already been committed or aborted",
                self.id
            )));
        }
        Ok(())
    }
}
