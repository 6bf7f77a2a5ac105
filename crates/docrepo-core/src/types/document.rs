//! The document model shared by stores and repositories.

use serde_json::{Map, Value};

/// A store-native document: a keyed mapping of field names to values.
pub type Document = Map<String, Value>;

/// Public identifier field exposed to application code.
pub const ID_FIELD: &str = "id";

/// Internal primary-key field used by the store.
pub const KEY_FIELD: &str = "_id";

/// Resolve a dotted path (`"address.city"`) inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set a value at a dotted path, creating intermediate objects as needed.
///
/// Returns `false` when an intermediate segment exists but is not an object.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> bool {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            true
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(map) => set_path(map, rest, value),
                _ => false,
            }
        }
    }
}

/// Remove the value at a dotted path, returning it when present.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            Value::Object(map) => remove_path(map, rest),
            _ => None,
        },
    }
}

/// String form of a key value.
///
/// Strings are returned verbatim; extended-JSON object ids
/// (`{"$oid": "..."}`) yield their hex string; anything else uses its JSON
/// rendering.
pub fn key_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(oid)) => oid.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}
