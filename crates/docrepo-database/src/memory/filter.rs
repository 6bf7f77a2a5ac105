//! Filter evaluation for the in-memory store.

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::{Map, Value};

use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;
use docrepo_core::types::document::{Document, KEY_FIELD, get_path};

use super::ordering::{compare_values, type_rank};

/// Whether `document` satisfies `filter`.
///
/// `null` matches everything; any other non-object filter matches on `_id`.
pub(crate) fn matches(document: &Document, filter: &Value) -> AppResult<bool> {
    match filter {
        Value::Null => Ok(true),
        Value::Object(map) => matches_document(document, map),
        key => Ok(document
            .get(KEY_FIELD)
            .is_some_and(|value| values_equal(value, key))),
    }
}

/// Whether an object consists solely of `$` operators (`{"$gt": 3}`).
pub(crate) fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

/// Structural equality with numeric comparison by value (`1 == 1.0`).
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

fn matches_document(document: &Document, filter: &Map<String, Value>) -> AppResult<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_clause(document, clauses(key, condition)?)?,
            "$nor" => !any_clause(document, clauses(key, condition)?)?,
            op if op.starts_with('$') => {
                return Err(AppError::validation(format!(
                    "Unsupported top-level query operator '{op}'"
                )));
            }
            path => matches_condition(get_path(document, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, condition: &'a Value) -> AppResult<&'a [Value]> {
    match condition {
        Value::Array(items) if !items.is_empty() => Ok(items),
        _ => Err(AppError::validation(format!(
            "{op} expects a non-empty array"
        ))),
    }
}

fn any_clause(document: &Document, clauses: &[Value]) -> AppResult<bool> {
    for clause in clauses {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn matches_condition(value: Option<&Value>, condition: &Value) -> AppResult<bool> {
    match condition {
        Value::Object(ops) if is_operator_object(ops) => {
            for (op, arg) in ops {
                if !apply_operator(value, op, arg, ops)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        target => Ok(equals(value, target)),
    }
}

fn apply_operator(
    value: Option<&Value>,
    op: &str,
    arg: &Value,
    siblings: &Map<String, Value>,
) -> AppResult<bool> {
    let matched = match op {
        "$eq" => equals(value, arg),
        "$ne" => !equals(value, arg),
        "$gt" => compares(value, arg, |o| o == Ordering::Greater),
        "$gte" => compares(value, arg, |o| o != Ordering::Less),
        "$lt" => compares(value, arg, |o| o == Ordering::Less),
        "$lte" => compares(value, arg, |o| o != Ordering::Greater),
        "$in" => operand_list(op, arg)?.iter().any(|t| equals(value, t)),
        "$nin" => !operand_list(op, arg)?.iter().any(|t| equals(value, t)),
        "$exists" => value.is_some() == is_truthy(arg),
        "$regex" => regex_matches(value, arg, siblings.get("$options"))?,
        "$options" => {
            if !siblings.contains_key("$regex") {
                return Err(AppError::validation("$options requires $regex"));
            }
            true
        }
        "$not" => !matches_condition(value, arg)?,
        "$size" => match value {
            Some(Value::Array(items)) => arg.as_u64() == Some(items.len() as u64),
            _ => false,
        },
        other => {
            return Err(AppError::validation(format!(
                "Unsupported query operator '{other}'"
            )));
        }
    };
    Ok(matched)
}

/// Evaluate `pred` against the field value, fanning out over array
/// elements when the target is not itself an array.
fn any_candidate(value: Option<&Value>, target: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        None => false,
        Some(Value::Array(items)) if !target.is_array() => items.iter().any(&pred),
        Some(v) => pred(v),
    }
}

fn equals(value: Option<&Value>, target: &Value) -> bool {
    if target.is_null() {
        return value.is_none_or(Value::is_null);
    }
    any_candidate(value, target, |v| values_equal(v, target))
}

fn compares(value: Option<&Value>, target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    any_candidate(value, target, |v| {
        type_rank(v) == type_rank(target) && accept(compare_values(v, target))
    })
}

fn operand_list<'a>(op: &str, arg: &'a Value) -> AppResult<&'a [Value]> {
    arg.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| AppError::validation(format!("{op} expects an array")))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

fn regex_matches(value: Option<&Value>, pattern: &Value, options: Option<&Value>) -> AppResult<bool> {
    let Value::String(pattern) = pattern else {
        return Err(AppError::validation("$regex expects a string pattern"));
    };
    let flags = options.and_then(Value::as_str).unwrap_or_default();
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| AppError::validation(format!("Invalid $regex pattern: {e}")))?;

    Ok(any_candidate(value, &Value::Null, |v| {
        v.as_str().is_some_and(|s| regex.is_match(s))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        json!({
            "_id": "abc123",
            "name": "Ann",
            "age": 34,
            "tags": ["admin", "ops"],
            "address": {"city": "Oslo"}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_equality_and_paths() {
        let d = sample();
        assert!(matches(&d, &json!({})).unwrap());
        assert!(matches(&d, &json!(null)).unwrap());
        assert!(matches(&d, &json!({"name": "Ann", "address.city": "Oslo"})).unwrap());
        assert!(matches(&d, &json!({"tags": "ops"})).unwrap());
        assert!(matches(&d, &json!({"age": 34.0})).unwrap());
        assert!(!matches(&d, &json!({"name": "Bob"})).unwrap());
        assert!(matches(&d, &json!({"missing": null})).unwrap());
    }

    #[test]
    fn test_primitive_filter_matches_key() {
        let d = sample();
        assert!(matches(&d, &json!("abc123")).unwrap());
        assert!(!matches(&d, &json!("zzz")).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let d = sample();
        assert!(matches(&d, &json!({"age": {"$gte": 34, "$lt": 40}})).unwrap());
        assert!(!matches(&d, &json!({"age": {"$gt": "10"}})).unwrap());
        assert!(matches(&d, &json!({"name": {"$in": ["Bob", "Ann"]}})).unwrap());
        assert!(matches(&d, &json!({"name": {"$nin": ["Bob"]}})).unwrap());
        assert!(matches(&d, &json!({"nick": {"$exists": false}})).unwrap());
        assert!(matches(&d, &json!({"name": {"$regex": "^an", "$options": "i"}})).unwrap());
        assert!(matches(&d, &json!({"tags": {"$size": 2}})).unwrap());
        assert!(matches(&d, &json!({"age": {"$not": {"$gt": 50}}})).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let d = sample();
        assert!(matches(&d, &json!({"$or": [{"name": "Bob"}, {"age": 34}]})).unwrap());
        assert!(!matches(&d, &json!({"$and": [{"name": "Ann"}, {"age": 1}]})).unwrap());
        assert!(matches(&d, &json!({"$nor": [{"name": "Bob"}]})).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let d = sample();
        assert!(matches(&d, &json!({"age": {"$near": 1}})).is_err());
        assert!(matches(&d, &json!({"$where": "1"})).is_err());
        assert!(matches(&d, &json!({"$or": []})).is_err());
    }
}
