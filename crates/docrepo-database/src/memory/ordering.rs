//! Value ordering, sorting, and projection for the in-memory store.

use std::cmp::Ordering;

use serde_json::Value;

use docrepo_core::types::document::{Document, KEY_FIELD, get_path, remove_path, set_path};
use docrepo_core::types::projection::{Projection, ProjectionMode};
use docrepo_core::types::sorting::{SortDirection, SortSpec};

static NULL: Value = Value::Null;

/// Cross-type ordering bracket: null < numbers < strings < objects < arrays < booleans.
pub(crate) fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values used by sorts, range operators and `$min`/`$max`.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

/// Compare two possibly-missing field values; missing sorts as null.
pub(crate) fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    compare_values(a.unwrap_or(&NULL), b.unwrap_or(&NULL))
}

/// Stable multi-key sort.
pub(crate) fn sort_documents(documents: &mut [Document], sort: &SortSpec) {
    if sort.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        for key in sort.fields() {
            let ordering = compare_optional(get_path(a, &key.field), get_path(b, &key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Apply a projection to one document.
pub(crate) fn project(document: &Document, projection: &Projection) -> Document {
    match projection.mode() {
        ProjectionMode::Include => {
            let mut out = Document::new();
            if !projection.excludes_key() {
                if let Some(key) = document.get(KEY_FIELD) {
                    out.insert(KEY_FIELD.to_string(), key.clone());
                }
            }
            for field in projection.fields() {
                if let Some(value) = get_path(document, field) {
                    set_path(&mut out, field, value.clone());
                }
            }
            out
        }
        ProjectionMode::Exclude => {
            let mut out = document.clone();
            for field in projection.fields() {
                remove_path(&mut out, field);
            }
            out
        }
    }
}
