//! Small document-building helpers for repository implementations.

use serde::Serialize;
use serde_json::Value;

use docrepo_core::result::AppResult;
use docrepo_core::types::document::Document;

pub use docrepo_core::types::object_id::new_object_id;

pub use crate::normalize::remove_undefined_values;

/// Build a `$set` body that updates the array element matched by the
/// positional operator.
///
/// `sub_document_set("items", &json!({"qty": 2}))` yields
/// `{"items.$.qty": 2}`.
pub fn sub_document_set<P>(name: &str, fields: &P) -> AppResult<Document>
where
    P: Serialize + ?Sized,
{
    let fields = crate::normalize::to_document(fields)?;
    Ok(fields
        .into_iter()
        .map(|(key, value)| (format!("{name}.$.{key}"), value))
        .collect())
}

/// Wrap a `$set` body into a full update document.
pub fn set_update(body: Document) -> Document {
    let mut update = Document::new();
    update.insert("$set".to_string(), Value::Object(body));
    update
}
