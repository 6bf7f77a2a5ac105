//! Reference population: replacing stored keys with the documents they
//! point to.

use serde_json::{Value, json};

use docrepo_core::result::AppResult;
use docrepo_core::traits::store::DocumentStore;
use docrepo_core::types::document::{Document, KEY_FIELD, get_path, set_path};
use docrepo_core::types::options::FindOptions;
use docrepo_core::types::projection::Projection;

use crate::normalize::denormalize_document;

/// Which reference field to resolve and where to look it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateOptions {
    /// Dotted path of the field holding a key or an array of keys.
    pub path: String,
    /// Collection the keys refer to.
    pub from: String,
    /// Fields to keep on the referenced documents.
    pub select: Option<Projection>,
}

impl PopulateOptions {
    /// Resolve `path` against collection `from`.
    pub fn new(path: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: from.into(),
            select: None,
        }
    }

    /// Restrict the fields copied from referenced documents.
    pub fn select(mut self, projection: Projection) -> Self {
        self.select = Some(projection);
        self
    }
}

/// Resolve one reference field across a batch of documents.
///
/// All keys are fetched with a single `$in` query. A single unresolved key
/// is left in place; unresolved entries of a key array are dropped.
pub(crate) async fn populate_documents<S>(
    store: &S,
    documents: &mut [&mut Document],
    options: &PopulateOptions,
) -> AppResult<()>
where
    S: DocumentStore,
{
    let mut keys: Vec<Value> = Vec::new();
    for document in documents.iter() {
        match get_path(document, &options.path) {
            Some(Value::Array(items)) => {
                for item in items {
                    push_key(&mut keys, item);
                }
            }
            Some(key) => push_key(&mut keys, key),
            None => {}
        }
    }
    if keys.is_empty() {
        return Ok(());
    }

    let filter = json!({ KEY_FIELD: { "$in": keys } });
    let mut referenced = store
        .find(
            &options.from,
            &filter,
            options.select.as_ref(),
            &FindOptions::default(),
        )
        .await?;
    for document in &mut referenced {
        denormalize_document(document);
    }

    let lookup = |key: &Value| {
        referenced
            .iter()
            .find(|d| d.get(KEY_FIELD) == Some(key))
            .map(|d| Value::Object(d.clone()))
    };

    for document in documents.iter_mut() {
        let resolved = match get_path(document, &options.path) {
            Some(Value::Array(items)) => Value::Array(items.iter().filter_map(lookup).collect()),
            Some(key) => match lookup(key) {
                Some(found) => found,
                None => continue,
            },
            None => continue,
        };
        set_path(document, &options.path, resolved);
    }
    Ok(())
}

fn push_key(keys: &mut Vec<Value>, key: &Value) {
    if !key.is_null() && !key.is_object() && !keys.contains(key) {
        keys.push(key.clone());
    }
}
