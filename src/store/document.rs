//! Document path access and value ordering
//!
//! Paths are dotted (`company.salesOwner.name`). Traversal descends into
//! arrays: `users.name` over an array of user documents resolves to the array
//! of their names. A numeric segment indexes into an array directly.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::{Map, Value};

/// Primary key field of every stored document.
pub const PRIMARY_KEY: &str = "_id";

/// Resolves a dotted path against a document.
///
/// Returns `None` when no value exists at the path.
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<Cow<'a, Value>> {
    let segments: Vec<&str> = path.split('.').collect();
    resolve_segments(document, &segments)
}

fn resolve_segments<'a>(value: &'a Value, segments: &[&str]) -> Option<Cow<'a, Value>> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(Cow::Borrowed(value));
    };

    match value {
        Value::Object(map) => resolve_segments(map.get(*head)?, rest),
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                return resolve_segments(items.get(index)?, rest);
            }
            let collected: Vec<Value> = items
                .iter()
                .filter_map(|item| resolve_segments(item, segments))
                .map(Cow::into_owned)
                .collect();
            if collected.is_empty() {
                None
            } else {
                Some(Cow::Owned(Value::Array(collected)))
            }
        }
        _ => None,
    }
}

/// Sets a value at a dotted path, creating intermediate objects.
///
/// A non-object intermediate value is replaced by an object.
pub fn set_path(document: &mut Value, path: &str, value: Value) {
    let mut current = document;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Extracts every scalar reachable at a path, flattening arrays one level.
///
/// Used for relation keys, where a local field may hold a single identifier
/// or a list of them.
pub fn key_values(document: &Value, path: &str) -> Vec<Value> {
    match resolve_path(document, path) {
        None => Vec::new(),
        Some(value) => match value.into_owned() {
            Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        },
    }
}

/// Rank of a JSON type in the total value ordering.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total ordering over JSON values.
///
/// Ordering rules:
/// - null < bool < number < string < array < object
/// - Same types use natural ordering; arrays compare element-wise
/// - Objects of equal type compare as equal
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let xf = x.as_f64().unwrap_or(0.0);
            let yf = y.as_f64().unwrap_or(0.0);
            xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys.iter()) {
                let ordering = compare_values(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            xs.len().cmp(&ys.len())
        }
        _ => Ordering::Equal,
    }
}

/// Ordering where a missing value sorts before every present value.
pub fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

/// Compares two values only when they share a JSON type.
///
/// Comparison operators never match across types, so `"10" > 9` is neither
/// true nor false but simply not comparable.
pub fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(_), Value::Bool(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_)) => Some(compare_values(a, b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            if a == b {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
        _ => None,
    }
}
