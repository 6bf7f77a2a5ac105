//! In-process document store.
//!
//! Collections are insertion-ordered vectors of JSON documents held in a
//! [`DashMap`]. No lock is held across an `.await`, so every operation is
//! a single, short critical section over one collection.

mod aggregate;
mod filter;
mod ordering;
mod session;
mod update;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::traits::store::DocumentStore;
use docrepo_core::types::ack::{DeleteResult, UpdateResult};
use docrepo_core::types::document::{Document, KEY_FIELD, key_to_string};
use docrepo_core::types::object_id::new_object_id;
use docrepo_core::types::options::{
    DeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions, UpdateOptions,
};
use docrepo_core::types::projection::Projection;

pub use self::session::MemorySession;

use self::filter::matches;
use self::ordering::{project, sort_documents};
use self::update::{apply_update, seed_from_filter};

/// In-memory document store.
///
/// Cloning is cheap and every clone shares the same collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transactional scope for grouped writes.
    pub fn start_session(&self) -> MemorySession {
        MemorySession::new(self.clone())
    }

    /// Number of documents currently stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    /// Whether `collection` holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Append staged documents, rejecting the whole batch on any key conflict.
    pub(crate) fn append_all(&self, collection: &str, documents: Vec<Document>) -> AppResult<()> {
        let mut stored = self.collections.entry(collection.to_string()).or_default();
        ensure_unique(&stored, &documents)?;
        stored.extend(documents);
        Ok(())
    }

    /// Whether a document with `key` exists in `collection`.
    pub(crate) fn contains_key(&self, collection: &str, key: &Value) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|c| c.iter().any(|d| d.get(KEY_FIELD) == Some(key)))
    }

    fn update_matching(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
        multi: bool,
    ) -> AppResult<UpdateResult> {
        let mut stored = self.collections.entry(collection.to_string()).or_default();

        let mut pending = Vec::new();
        for (index, document) in stored.iter().enumerate() {
            if !matches(document, filter)? {
                continue;
            }
            let mut next = document.clone();
            apply_update(&mut next, update, false)?;
            pending.push((index, next));
            if !multi {
                break;
            }
        }

        if pending.is_empty() {
            if !options.upsert {
                return Ok(UpdateResult::default());
            }
            let mut inserted = seed_from_filter(filter);
            apply_update(&mut inserted, update, true)?;
            let key = assign_key(&mut inserted);
            ensure_unique(&stored, std::slice::from_ref(&inserted))?;
            stored.push(inserted);
            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(key),
            });
        }

        let matched_count = pending.len() as u64;
        let mut modified_count = 0;
        for (index, next) in pending {
            if stored[index] != next {
                stored[index] = next;
                modified_count += 1;
            }
        }

        Ok(UpdateResult {
            matched_count,
            modified_count,
            upserted_id: None,
        })
    }

    fn delete_matching(&self, collection: &str, filter: &Value, multi: bool) -> AppResult<DeleteResult> {
        let Some(mut stored) = self.collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };

        let mut doomed = Vec::new();
        for (index, document) in stored.iter().enumerate() {
            if matches(document, filter)? {
                doomed.push(index);
                if !multi {
                    break;
                }
            }
        }
        for index in doomed.iter().rev() {
            stored.remove(*index);
        }

        Ok(DeleteResult {
            deleted_count: doomed.len() as u64,
        })
    }
}

/// Give a document an `_id` when it has none, returning the key.
pub(crate) fn assign_key(document: &mut Document) -> Value {
    match document.get(KEY_FIELD) {
        Some(key) if !key.is_null() => key.clone(),
        _ => {
            let key = Value::String(new_object_id());
            document.insert(KEY_FIELD.to_string(), key.clone());
            key
        }
    }
}

fn ensure_unique(existing: &[Document], incoming: &[Document]) -> AppResult<()> {
    for (position, document) in incoming.iter().enumerate() {
        let Some(key) = document.get(KEY_FIELD) else {
            continue;
        };
        let clash = existing.iter().any(|d| d.get(KEY_FIELD) == Some(key))
            || incoming[..position]
                .iter()
                .any(|d| d.get(KEY_FIELD) == Some(key));
        if clash {
            return Err(AppError::conflict(format!(
                "Duplicate key: _id '{}' already exists",
                key_to_string(key)
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    type Session = MemorySession;

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
        session: Option<&mut MemorySession>,
    ) -> AppResult<Document> {
        let key = assign_key(&mut document);
        trace!(collection, key = %key_to_string(&key), staged = session.is_some(), "insert_one");

        match session {
            Some(session) => {
                if self.contains_key(collection, &key) {
                    return Err(AppError::conflict(format!(
                        "Duplicate key: _id '{}' already exists",
                        key_to_string(&key)
                    )));
                }
                session.stage(collection, document.clone())?;
            }
            None => self.append_all(collection, vec![document.clone()])?,
        }
        Ok(document)
    }

    async fn insert_many(
        &self,
        collection: &str,
        mut documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> AppResult<Vec<Document>> {
        trace!(collection, count = documents.len(), ordered = options.ordered, "insert_many");
        for document in &mut documents {
            assign_key(document);
        }
        self.append_all(collection, documents.clone())?;
        Ok(documents)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let mut found = Vec::new();
        if let Some(stored) = self.collections.get(collection) {
            for document in stored.iter() {
                if matches(document, filter)? {
                    found.push(document.clone());
                }
            }
        }
        trace!(collection, matched = found.len(), "find");

        if let Some(sort) = &options.sort {
            sort_documents(&mut found, sort);
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);

        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match projection {
                Some(p) => project(&d, p),
                None => d,
            })
            .collect())
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        projection: Option<&Projection>,
        options: &FindOneAndUpdateOptions,
    ) -> AppResult<Option<Document>> {
        trace!(collection, upsert = options.upsert, "find_one_and_update");
        let mut stored = self.collections.entry(collection.to_string()).or_default();

        let mut candidates = Vec::new();
        for (index, document) in stored.iter().enumerate() {
            if matches(document, filter)? {
                candidates.push(index);
            }
        }
        if let Some(sort) = &options.sort {
            let mut ordered: Vec<Document> = candidates.iter().map(|i| stored[*i].clone()).collect();
            let keys: Vec<Option<Value>> = ordered.iter().map(|d| d.get(KEY_FIELD).cloned()).collect();
            sort_documents(&mut ordered, sort);
            candidates = ordered
                .iter()
                .filter_map(|d| {
                    let key = d.get(KEY_FIELD).cloned();
                    keys.iter()
                        .position(|k| *k == key)
                        .map(|p| candidates[p])
                })
                .collect();
        }

        let shape = |document: Document| match projection {
            Some(p) => project(&document, p),
            None => document,
        };

        if let Some(&index) = candidates.first() {
            let before = stored[index].clone();
            let mut after = before.clone();
            apply_update(&mut after, update, false)?;
            stored[index] = after.clone();
            return Ok(Some(shape(if options.return_new { after } else { before })));
        }

        if !options.upsert {
            return Ok(None);
        }

        let mut inserted = seed_from_filter(filter);
        apply_update(&mut inserted, update, true)?;
        assign_key(&mut inserted);
        ensure_unique(&stored, std::slice::from_ref(&inserted))?;
        stored.push(inserted.clone());
        Ok(options.return_new.then(|| shape(inserted)))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult> {
        trace!(collection, "update_one");
        self.update_matching(collection, filter, update, options, false)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Value,
        update: &Document,
        options: &UpdateOptions,
    ) -> AppResult<UpdateResult> {
        trace!(collection, "update_many");
        self.update_matching(collection, filter, update, options, true)
    }

    async fn delete_one(&self, collection: &str, filter: &Value) -> AppResult<DeleteResult> {
        trace!(collection, "delete_one");
        self.delete_matching(collection, filter, false)
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Value,
        options: &DeleteOptions,
    ) -> AppResult<DeleteResult> {
        trace!(collection, comment = options.comment.as_deref(), "delete_many");
        self.delete_matching(collection, filter, true)
    }

    async fn count_documents(&self, collection: &str, filter: &Value) -> AppResult<u64> {
        let Some(stored) = self.collections.get(collection) else {
            return Ok(0);
        };
        let mut count = 0;
        for document in stored.iter() {
            if matches(document, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Document]) -> AppResult<Vec<Document>> {
        trace!(collection, stages = pipeline.len(), "aggregate");
        let documents = self
            .collections
            .get(collection)
            .map(|c| c.value().clone())
            .unwrap_or_default();
        aggregate::run_pipeline(documents, pipeline)
    }
}
