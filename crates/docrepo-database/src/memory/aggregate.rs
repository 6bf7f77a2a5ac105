//! Aggregation pipeline evaluation for the in-memory store.
//!
//! Supported stages: `$match`, `$sort`, `$skip`, `$limit`, `$project`,
//! `$count`, `$group` and `$unwind`. Anything else is a validation error.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::types::document::{Document, KEY_FIELD, get_path, remove_path, set_path};
use docrepo_core::types::sorting::{SortField, SortSpec};

use super::filter::{matches, values_equal};
use super::ordering::{compare_values, sort_documents};

/// Run `pipeline` over `documents`, stage by stage, in the given order.
pub(crate) fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> AppResult<Vec<Document>> {
    for stage in pipeline {
        let (name, spec) = match stage.iter().next() {
            Some(entry) if stage.len() == 1 => entry,
            _ => {
                return Err(AppError::validation(
                    "A pipeline stage must contain exactly one operator",
                ));
            }
        };

        documents = match name.as_str() {
            "$match" => {
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if matches(&document, spec)? {
                        kept.push(document);
                    }
                }
                kept
            }
            "$sort" => {
                sort_documents(&mut documents, &sort_spec(spec)?);
                documents
            }
            "$skip" => documents.into_iter().skip(count_arg(name, spec)?).collect(),
            "$limit" => documents.into_iter().take(count_arg(name, spec)?).collect(),
            "$project" => project_stage(documents, spec)?,
            "$count" => count_stage(documents, spec)?,
            "$group" => group_stage(documents, spec)?,
            "$unwind" => unwind_stage(documents, spec)?,
            other => {
                return Err(AppError::validation(format!(
                    "Unsupported pipeline stage '{other}'"
                )));
            }
        };
    }
    Ok(documents)
}

fn sort_spec(spec: &Value) -> AppResult<SortSpec> {
    let Value::Object(keys) = spec else {
        return Err(AppError::validation("$sort expects a document"));
    };
    keys.iter()
        .map(|(field, direction)| match direction.as_i64() {
            Some(1) => Ok(SortField::asc(field.clone())),
            Some(-1) => Ok(SortField::desc(field.clone())),
            _ => Err(AppError::validation(format!(
                "$sort direction for '{field}' must be 1 or -1"
            ))),
        })
        .collect::<AppResult<Vec<_>>>()
        .map(SortSpec)
}

fn count_arg(stage: &str, spec: &Value) -> AppResult<usize> {
    spec.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| AppError::validation(format!("{stage} expects a non-negative integer")))
}

fn is_excluded(value: &Value) -> bool {
    matches!(value, Value::Bool(false)) || value.as_f64() == Some(0.0)
}

fn project_stage(documents: Vec<Document>, spec: &Value) -> AppResult<Vec<Document>> {
    let Value::Object(spec) = spec else {
        return Err(AppError::validation("$project expects a document"));
    };

    let exclusions: Vec<&String> = spec
        .iter()
        .filter(|(_, v)| is_excluded(v))
        .map(|(k, _)| k)
        .collect();
    let inclusive = spec
        .iter()
        .any(|(k, v)| k != KEY_FIELD && !is_excluded(v));

    if !inclusive {
        return Ok(documents
            .into_iter()
            .map(|mut document| {
                for field in &exclusions {
                    remove_path(&mut document, field);
                }
                document
            })
            .collect());
    }

    if exclusions.iter().any(|k| k.as_str() != KEY_FIELD) {
        return Err(AppError::validation(
            "$project cannot mix inclusion and exclusion",
        ));
    }

    let keep_key = spec.get(KEY_FIELD).is_none_or(|v| !is_excluded(v));
    Ok(documents
        .iter()
        .map(|document| {
            let mut out = Document::new();
            if keep_key && !spec.contains_key(KEY_FIELD) {
                if let Some(key) = document.get(KEY_FIELD) {
                    out.insert(KEY_FIELD.to_string(), key.clone());
                }
            }
            for (field, expr) in spec {
                if is_excluded(expr) {
                    continue;
                }
                let value = match expr {
                    Value::String(s) if s.starts_with('$') => get_path(document, &s[1..]).cloned(),
                    Value::Bool(true) | Value::Number(_) => get_path(document, field).cloned(),
                    literal => Some(literal.clone()),
                };
                if let Some(value) = value {
                    set_path(&mut out, field, value);
                }
            }
            out
        })
        .collect())
}

fn count_stage(documents: Vec<Document>, spec: &Value) -> AppResult<Vec<Document>> {
    let field = spec
        .as_str()
        .filter(|f| !f.is_empty() && !f.starts_with('$'))
        .ok_or_else(|| AppError::validation("$count expects a field name"))?;
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Document::new();
    out.insert(field.to_string(), Value::from(documents.len() as u64));
    Ok(vec![out])
}

fn evaluate(document: &Document, expr: &Value) -> Value {
    match expr {
        Value::String(s) if s.starts_with('$') => {
            get_path(document, &s[1..]).cloned().unwrap_or(Value::Null)
        }
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), evaluate(document, v)))
                .collect::<Map<_, _>>(),
        ),
        literal => literal.clone(),
    }
}

fn group_stage(documents: Vec<Document>, spec: &Value) -> AppResult<Vec<Document>> {
    let Value::Object(spec) = spec else {
        return Err(AppError::validation("$group expects a document"));
    };
    let key_expr = spec
        .get(KEY_FIELD)
        .ok_or_else(|| AppError::validation("$group requires an _id expression"))?;

    let mut groups: Vec<(Value, Vec<Document>)> = Vec::new();
    for document in documents {
        let key = evaluate(&document, key_expr);
        match groups.iter_mut().find(|(k, _)| values_equal(k, &key)) {
            Some((_, members)) => members.push(document),
            None => groups.push((key, vec![document])),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut row = Document::new();
        row.insert(KEY_FIELD.to_string(), key);
        for (field, accumulator) in spec {
            if field == KEY_FIELD {
                continue;
            }
            let (op, expr) = match accumulator {
                Value::Object(acc) if acc.len() == 1 => acc.iter().next().ok_or_else(|| {
                    AppError::validation(format!("Accumulator for '{field}' is empty"))
                })?,
                _ => {
                    return Err(AppError::validation(format!(
                        "Field '{field}' must be an accumulator object"
                    )));
                }
            };
            row.insert(field.clone(), accumulate(op, expr, &members)?);
        }
        out.push(row);
    }
    Ok(out)
}

fn accumulate(op: &str, expr: &Value, members: &[Document]) -> AppResult<Value> {
    let values = members.iter().map(|d| evaluate(d, expr));
    let result = match op {
        "$sum" => sum(values),
        "$avg" => {
            let numbers: Vec<f64> = values.filter_map(|v| v.as_f64()).collect();
            if numbers.is_empty() {
                Value::Null
            } else {
                Value::from(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        "$min" => extreme(values, Ordering::Less),
        "$max" => extreme(values, Ordering::Greater),
        "$first" => members
            .first()
            .map(|d| evaluate(d, expr))
            .unwrap_or(Value::Null),
        "$last" => members
            .last()
            .map(|d| evaluate(d, expr))
            .unwrap_or(Value::Null),
        "$push" => Value::Array(values.collect()),
        "$addToSet" => {
            let mut set: Vec<Value> = Vec::new();
            for value in values {
                if !set.iter().any(|v| values_equal(v, &value)) {
                    set.push(value);
                }
            }
            Value::Array(set)
        }
        other => {
            return Err(AppError::validation(format!(
                "Unsupported accumulator '{other}'"
            )));
        }
    };
    Ok(result)
}

fn sum(values: impl Iterator<Item = Value>) -> Value {
    let mut integer: i64 = 0;
    let mut float: f64 = 0.0;
    let mut is_float = false;
    for value in values {
        let Value::Number(n) = value else { continue };
        match n.as_i64() {
            Some(i) if !is_float => match integer.checked_add(i) {
                Some(total) => integer = total,
                None => {
                    is_float = true;
                    float = integer as f64 + i as f64;
                }
            },
            _ => {
                if !is_float {
                    is_float = true;
                    float = integer as f64;
                }
                float += n.as_f64().unwrap_or(0.0);
            }
        }
    }
    if is_float {
        Value::from(float)
    } else {
        Value::from(integer)
    }
}

fn extreme(values: impl Iterator<Item = Value>, wanted: Ordering) -> Value {
    values
        .filter(|v| !v.is_null())
        .reduce(|best, v| {
            if compare_values(&v, &best) == wanted {
                v
            } else {
                best
            }
        })
        .unwrap_or(Value::Null)
}

fn unwind_stage(documents: Vec<Document>, spec: &Value) -> AppResult<Vec<Document>> {
    let (path, preserve) = match spec {
        Value::String(path) => (path.as_str(), false),
        Value::Object(options) => (
            options.get("path").and_then(Value::as_str).unwrap_or_default(),
            options
                .get("preserveNullAndEmptyArrays")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        ),
        _ => ("", false),
    };
    let Some(path) = path.strip_prefix('$').filter(|p| !p.is_empty()) else {
        return Err(AppError::validation("$unwind expects a '$field' path"));
    };

    let mut out = Vec::new();
    for document in documents {
        match get_path(&document, path) {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items.clone() {
                    let mut copy = document.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {
                if preserve {
                    out.push(document);
                }
            }
            Some(_) => out.push(document),
        }
    }
    Ok(out)
}
