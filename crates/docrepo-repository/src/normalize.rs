//! Identifier normalization between the public `id` field and the store's
//! `_id` key.
//!
//! Queries travel inbound through [`normalize_query`]; entity-shaped results
//! travel outbound through [`Outbound::denormalize`]. Write acknowledgements,
//! counts and booleans implement [`Outbound`] as a no-op so that every
//! repository operation can run through the same dispatch path.

use serde::Serialize;
use serde_json::Value;

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::types::ack::{DeleteResult, UpdateResult};
use docrepo_core::types::document::{Document, ID_FIELD, KEY_FIELD, key_to_string};
use docrepo_core::types::pagination::Page;

/// Update operators whose bodies are checked for a stray `id`.
const FIELD_SETTERS: [&str; 2] = ["$set", "$setOnInsert"];

/// Rewrite a query's top-level `id` key to `_id`.
///
/// Returns `None` when `input` is not an object: the caller must then
/// dispatch its original value untouched. Nested documents are never
/// rewritten.
pub fn normalize_query(input: &Value) -> Option<Document> {
    let Value::Object(map) = input else {
        return None;
    };
    let mut query = map.clone();
    if let Some(id) = query.remove(ID_FIELD) {
        query.insert(KEY_FIELD.to_string(), id);
    }
    Some(query)
}

/// Inbound form of a query: normalized when it is an object, as-is otherwise.
pub fn normalized_filter(input: &Value) -> Value {
    match normalize_query(input) {
        Some(query) => Value::Object(query),
        None => input.clone(),
    }
}

/// Expose `id` next to `_id` on a single document.
///
/// Documents without a (non-null) `_id` are left alone; `_id` itself is
/// always kept.
pub fn denormalize_document(document: &mut Document) {
    let id = match document.get(KEY_FIELD) {
        None | Some(Value::Null) => return,
        Some(key) => key_to_string(key),
    };
    document.insert(ID_FIELD.to_string(), Value::String(id));
}

/// Expose `id` on an entity or on each entity of a sequence.
pub fn denormalize(value: &mut Value) {
    match value {
        Value::Object(document) => denormalize_document(document),
        Value::Array(items) => {
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                denormalize_document(item);
            }
        }
        _ => {}
    }
}

/// Outbound half of the identifier round-trip.
///
/// Implemented by everything a repository operation can return. Entity
/// shapes gain an `id`; raw acknowledgements and scalars pass through.
pub trait Outbound {
    /// Rewrite the value in place before it reaches the caller.
    fn denormalize(&mut self) {}
}

impl Outbound for Document {
    fn denormalize(&mut self) {
        denormalize_document(self);
    }
}

impl Outbound for Value {
    fn denormalize(&mut self) {
        denormalize(self);
    }
}

impl<T: Outbound> Outbound for Vec<T> {
    fn denormalize(&mut self) {
        for item in self.iter_mut() {
            item.denormalize();
        }
    }
}

impl<T: Outbound> Outbound for Option<T> {
    fn denormalize(&mut self) {
        if let Some(inner) = self {
            inner.denormalize();
        }
    }
}

impl<T: Outbound> Outbound for Page<T> {
    fn denormalize(&mut self) {
        self.data.denormalize();
    }
}

impl Outbound for UpdateResult {}
impl Outbound for DeleteResult {}
impl Outbound for u64 {}
impl Outbound for bool {}

/// Serialize a caller payload into a document.
pub fn to_document<P>(payload: &P) -> AppResult<Document>
where
    P: Serialize + ?Sized,
{
    match serde_json::to_value(payload)? {
        Value::Object(document) => Ok(document),
        other => Err(AppError::validation(format!(
            "Payload must be a document, got {}",
            type_name(&other)
        ))),
    }
}

/// Drop top-level fields whose value is `null`.
///
/// Partial entity structs serialize unset `Option` fields as `null`; those
/// must not overwrite stored values.
pub fn remove_undefined_values(document: &mut Document) {
    document.retain(|_, value| !value.is_null());
}

/// Remove `id` from an update, at the top level and inside field setters.
pub fn strip_identifier(update: &mut Document) {
    update.remove(ID_FIELD);
    for setter in FIELD_SETTERS {
        if let Some(Value::Object(body)) = update.get_mut(setter) {
            body.remove(ID_FIELD);
        }
    }
}

/// Turn an update payload into a store update document.
///
/// The identifier is stripped and a body without `$` operators is wrapped
/// in `$set`, so a plain partial entity never replaces the whole document.
pub fn into_update_document(mut update: Document) -> Document {
    strip_identifier(&mut update);
    if update.keys().any(|k| k.starts_with('$')) {
        return update;
    }
    let mut wrapped = Document::new();
    wrapped.insert("$set".to_string(), Value::Object(update));
    wrapped
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_normalize_renames_top_level_id_only() {
        let input = json!({"id": "abc123", "name": "x", "owner": {"id": "o1"}});
        let query = normalize_query(&input).unwrap();
        assert_eq!(
            Value::Object(query),
            json!({"_id": "abc123", "name": "x", "owner": {"id": "o1"}})
        );
        assert_eq!(input["id"], json!("abc123"));
    }

    #[test]
    fn test_normalize_without_id_is_a_copy() {
        let input = json!({"name": "x"});
        assert_eq!(normalize_query(&input), Some(doc(input.clone())));
        assert_eq!(normalize_query(&json!({})), Some(Document::new()));
    }

    #[test]
    fn test_normalize_skips_non_objects() {
        for input in [json!("abc123"), json!(7), json!(null), json!([{"id": 1}])] {
            assert!(normalize_query(&input).is_none());
            assert_eq!(normalized_filter(&input), input);
        }
    }

    #[test]
    fn test_denormalize_keeps_key() {
        let mut entity = json!({"_id": "abc123", "name": "x"});
        denormalize(&mut entity);
        assert_eq!(entity, json!({"_id": "abc123", "id": "abc123", "name": "x"}));

        let mut numeric = json!({"_id": 42});
        denormalize(&mut numeric);
        assert_eq!(numeric["id"], json!("42"));
    }

    #[test]
    fn test_denormalize_sequences_skip_keyless_items() {
        let mut items = json!([{"_id": "a"}, {"name": "no key"}, {"_id": null}, 3]);
        denormalize(&mut items);
        assert_eq!(
            items,
            json!([{"_id": "a", "id": "a"}, {"name": "no key"}, {"_id": null}, 3])
        );
    }

    #[test]
    fn test_outbound_passthrough_for_acks() {
        let mut ack = UpdateResult {
            matched_count: 1,
            modified_count: 1,
            upserted_id: Some(json!("k")),
        };
        ack.denormalize();
        assert_eq!(ack.upserted_id, Some(json!("k")));

        let mut found: Option<Vec<Document>> = Some(vec![doc(json!({"_id": "k"}))]);
        found.denormalize();
        assert_eq!(found.unwrap()[0]["id"], json!("k"));
    }

    #[test]
    fn test_update_document_strips_and_wraps() {
        let update = into_update_document(doc(json!({"name": "x", "id": "zzz"})));
        assert_eq!(Value::Object(update), json!({"$set": {"name": "x"}}));

        let update = into_update_document(doc(json!({
            "$set": {"id": "zzz", "name": "x"},
            "$setOnInsert": {"id": "zzz"},
            "$inc": {"n": 1}
        })));
        assert_eq!(
            Value::Object(update),
            json!({"$set": {"name": "x"}, "$setOnInsert": {}, "$inc": {"n": 1}})
        );
    }

    #[test]
    fn test_payload_must_be_a_document() {
        assert!(to_document(&json!({"a": 1})).is_ok());
        let err = to_document(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind, docrepo_core::error::ErrorKind::Validation);
    }

    #[test]
    fn test_remove_undefined_values() {
        let mut d = doc(json!({"a": null, "b": 0, "c": {"d": null}}));
        remove_undefined_values(&mut d);
        assert_eq!(Value::Object(d), json!({"b": 0, "c": {"d": null}}));
    }
}
