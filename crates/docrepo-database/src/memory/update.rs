//! Update-operator application for the in-memory store.

use serde_json::{Number, Value};

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::types::document::{Document, KEY_FIELD, get_path, remove_path, set_path};

use super::filter::is_operator_object;

/// Apply an update document in place.
///
/// An update without `$` operators replaces every field except `_id`.
/// `$setOnInsert` only takes effect when `inserting` is set.
pub(crate) fn apply_update(document: &mut Document, update: &Document, inserting: bool) -> AppResult<()> {
    let operators = update.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return replace(document, update);
    }
    if operators != update.len() {
        return Err(AppError::validation(
            "Update document cannot mix operators and plain fields",
        ));
    }

    for (op, fields) in update {
        let Value::Object(fields) = fields else {
            return Err(AppError::validation(format!("{op} expects a document")));
        };
        for (path, arg) in fields {
            if path.split('.').any(|segment| segment.starts_with('$')) {
                return Err(AppError::not_implemented(format!(
                    "Positional update paths are not supported by the memory store: '{path}'"
                )));
            }
            match op.as_str() {
                "$set" => set(document, path, arg)?,
                "$setOnInsert" => {
                    if inserting {
                        set(document, path, arg)?;
                    }
                }
                "$unset" => {
                    remove_path(document, path);
                }
                "$inc" => increment(document, path, arg)?,
                "$push" => push(document, path, arg)?,
                other => {
                    return Err(AppError::validation(format!(
                        "Unsupported update operator '{other}'"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Seed an upserted document from the equality clauses of a filter.
pub(crate) fn seed_from_filter(filter: &Value) -> Document {
    let mut document = Document::new();
    match filter {
        Value::Null => {}
        Value::Object(map) => {
            for (key, condition) in map {
                if key.starts_with('$') {
                    continue;
                }
                match condition {
                    Value::Object(ops) if is_operator_object(ops) => {
                        if let Some(value) = ops.get("$eq") {
                            set_path(&mut document, key, value.clone());
                        }
                    }
                    value => {
                        set_path(&mut document, key, value.clone());
                    }
                }
            }
        }
        key => {
            document.insert(KEY_FIELD.to_string(), key.clone());
        }
    }
    document
}

fn replace(document: &mut Document, replacement: &Document) -> AppResult<()> {
    let key = document.get(KEY_FIELD).cloned();
    if let (Some(current), Some(requested)) = (&key, replacement.get(KEY_FIELD)) {
        if current != requested {
            return Err(immutable_key());
        }
    }
    document.clear();
    if let Some(key) = key {
        document.insert(KEY_FIELD.to_string(), key);
    }
    for (field, value) in replacement {
        document.insert(field.clone(), value.clone());
    }
    Ok(())
}

fn set(document: &mut Document, path: &str, value: &Value) -> AppResult<()> {
    if path == KEY_FIELD && document.get(KEY_FIELD).is_some_and(|k| k != value) {
        return Err(immutable_key());
    }
    if !set_path(document, path, value.clone()) {
        return Err(AppError::validation(format!(
            "Cannot create field path '{path}' through a non-object value"
        )));
    }
    Ok(())
}

fn increment(document: &mut Document, path: &str, delta: &Value) -> AppResult<()> {
    let Value::Number(delta) = delta else {
        return Err(AppError::validation(format!("$inc on '{path}' expects a number")));
    };
    let next = match get_path(document, path) {
        None | Some(Value::Null) => Value::Number(delta.clone()),
        Some(Value::Number(current)) => add_numbers(current, delta),
        Some(_) => {
            return Err(AppError::validation(format!(
                "$inc cannot be applied to non-numeric field '{path}'"
            )));
        }
    };
    set(document, path, &next)
}

fn push(document: &mut Document, path: &str, arg: &Value) -> AppResult<()> {
    let items = match arg {
        Value::Object(spec) if spec.contains_key("$each") => match spec.get("$each") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(AppError::validation("$each expects an array")),
        },
        item => vec![item.clone()],
    };
    let next = match get_path(document, path) {
        None => items,
        Some(Value::Array(current)) => {
            let mut current = current.clone();
            current.extend(items);
            current
        }
        Some(_) => {
            return Err(AppError::validation(format!(
                "$push cannot be applied to non-array field '{path}'"
            )));
        }
    };
    set(document, path, &Value::Array(next))
}

fn add_numbers(a: &Number, b: &Number) -> Value {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x
            .checked_add(y)
            .map(Value::from)
            .unwrap_or_else(|| Value::from(x as f64 + y as f64)),
        _ => Value::from(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0)),
    }
}

fn immutable_key() -> AppError {
    AppError::validation("Performing an update on '_id' would modify the immutable key")
}
