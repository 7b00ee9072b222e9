//! Sort specification and compilation

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::normalize::normalize_path;
use crate::store::document::{compare_optional, resolve_path};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Engine sort order: `1` ascending, `-1` descending
    pub fn order(&self) -> i8 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// One `(field, direction)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordered sort request; the first field has the highest priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortField>);

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.0.push(SortField::asc(field));
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.0.push(SortField::desc(field));
        self
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<SortField>> for SortSpec {
    fn from(fields: Vec<SortField>) -> Self {
        Self(fields)
    }
}

/// One compiled sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub order: i8,
}

/// Compound sort key list, compared left to right
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSort {
    keys: Vec<SortKey>,
}

impl NativeSort {
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compares two documents under this sort
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.keys {
            let left = resolve_path(a, &key.path);
            let right = resolve_path(b, &key.path);
            let ordering = compare_optional(left.as_deref(), right.as_deref());
            let ordering = if key.order < 0 {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for key in &self.keys {
            body.insert(key.path.clone(), Value::from(key.order));
        }
        Value::Object(body)
    }
}

/// Compiles sort requests
pub struct SortCompiler;

impl SortCompiler {
    /// Compile a sort request.
    ///
    /// Returns `None` for an empty request; no default order is applied.
    pub fn compile(spec: &SortSpec) -> Option<NativeSort> {
        let mut keys: Vec<SortKey> = Vec::with_capacity(spec.0.len());
        for field in &spec.0 {
            let path = normalize_path(&field.field);
            if keys.iter().any(|k| k.path == path) {
                continue;
            }
            keys.push(SortKey {
                path,
                order: field.direction.order(),
            });
        }

        if keys.is_empty() {
            None
        } else {
            Some(NativeSort { keys })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_sort_compiles_to_none() {
        assert_eq!(SortCompiler::compile(&SortSpec::new()), None);
    }

    #[test]
    fn test_directions_and_order() {
        let sort = SortCompiler::compile(&SortSpec::new().asc("name").desc("createdAt")).unwrap();
        assert_eq!(sort.to_json(), json!({"name": 1, "createdAt": -1}));
        let paths: Vec<&str> = sort.keys().iter().map(|k| k.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "createdAt"]);
    }

    #[test]
    fn test_id_rewritten_and_duplicates_dropped() {
        let sort = SortCompiler::compile(&SortSpec::new().desc("id").asc("id")).unwrap();
        assert_eq!(
            sort.keys(),
            &[SortKey {
                path: "_id".into(),
                order: -1
            }]
        );
    }

    #[test]
    fn test_wire_shape() {
        let spec: SortSpec =
            serde_json::from_value(json!([{"field": "name", "direction": "ASC"}])).unwrap();
        assert_eq!(spec, SortSpec::new().asc("name"));
        assert!(serde_json::from_value::<SortSpec>(json!([{"field": "x", "direction": "up"}]))
            .is_err());
    }

    #[test]
    fn test_compound_compare() {
        let sort = SortCompiler::compile(&SortSpec::new().asc("stage").desc("value")).unwrap();
        let a = json!({"stage": "A", "value": 1});
        let b = json!({"stage": "A", "value": 5});
        let c = json!({"stage": "B", "value": 9});

        assert_eq!(sort.compare(&b, &a), Ordering::Less);
        assert_eq!(sort.compare(&a, &c), Ordering::Less);
    }

    #[test]
    fn test_missing_sorts_first_ascending() {
        let sort = SortCompiler::compile(&SortSpec::new().asc("dueDate")).unwrap();
        assert_eq!(
            sort.compare(&json!({}), &json!({"dueDate": null})),
            Ordering::Less
        );
    }
}
