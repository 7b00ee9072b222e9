//! Native predicate tree evaluated by the document engine
//!
//! Operands are typed: dates and identifiers are compared against stored
//! strings after parsing those strings into the same type.
//!
//! Matching follows document-store conventions:
//! - Negated conditions also match documents where the field is missing
//! - A scalar operand matches an array field when any element matches

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Regex, RegexBuilder};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::store::document::{compare_same_type, resolve_path};

use super::normalize::{parse_date, parse_identifier};

/// A typed operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Json(Value),
    Date(DateTime<Utc>),
    Id(Uuid),
}

impl Operand {
    /// Orders a stored value relative to this operand.
    ///
    /// `Some(Greater)` means the stored value is greater than the operand.
    pub fn compare_stored(&self, stored: &Value) -> Option<Ordering> {
        match self {
            Operand::Json(expected) => compare_same_type(stored, expected),
            Operand::Date(expected) => parse_date(stored).map(|d| d.cmp(expected)),
            Operand::Id(expected) => parse_identifier(stored).map(|id| id.cmp(expected)),
        }
    }

    /// Orders two operands of the same kind
    pub fn compare_operand(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Json(a), Operand::Json(b)) => compare_same_type(a, b),
            (Operand::Date(a), Operand::Date(b)) => Some(a.cmp(b)),
            (Operand::Id(a), Operand::Id(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn equals_stored(&self, stored: &Value) -> bool {
        self.compare_stored(stored) == Some(Ordering::Equal)
    }

    /// Extended-JSON rendering used by explain output
    pub fn to_json(&self) -> Value {
        match self {
            Operand::Json(v) => v.clone(),
            Operand::Date(d) => json!({ "$date": d.to_rfc3339_opts(SecondsFormat::Millis, true) }),
            Operand::Id(id) => json!({ "$id": id.to_string() }),
        }
    }
}

/// Compiled substring pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Builds a literal substring matcher for `text`.
    pub fn literal(text: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self {
            source: text.to_string(),
            case_insensitive,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn is_match(&self, stored: &Value) -> bool {
        stored.as_str().is_some_and(|s| self.regex.is_match(s))
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("$regex".into(), Value::String(regex::escape(&self.source)));
        if self.case_insensitive {
            body.insert("$options".into(), Value::String("i".into()));
        }
        Value::Object(body)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// Field-level condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Exists(bool),
    Eq(Operand),
    Ne(Operand),
    Gt(Operand),
    Gte(Operand),
    Lt(Operand),
    Lte(Operand),
    Matches(Pattern),
    NotMatches(Pattern),
    In(Vec<Operand>),
    NotIn(Vec<Operand>),
    Range { min: Operand, max: Operand },
    NotRange { min: Operand, max: Operand },
}

impl Condition {
    fn evaluate(&self, stored: Option<&Value>) -> bool {
        match self {
            Condition::Exists(expected) => stored.is_some() == *expected,
            Condition::Eq(op) => any_element(stored, |v| op.equals_stored(v)),
            Condition::Ne(op) => !any_element(stored, |v| op.equals_stored(v)),
            Condition::Gt(op) => any_element(stored, |v| op.compare_stored(v) == Some(Ordering::Greater)),
            Condition::Gte(op) => any_element(stored, |v| {
                matches!(op.compare_stored(v), Some(Ordering::Greater | Ordering::Equal))
            }),
            Condition::Lt(op) => any_element(stored, |v| op.compare_stored(v) == Some(Ordering::Less)),
            Condition::Lte(op) => any_element(stored, |v| {
                matches!(op.compare_stored(v), Some(Ordering::Less | Ordering::Equal))
            }),
            Condition::Matches(p) => any_element(stored, |v| p.is_match(v)),
            Condition::NotMatches(p) => !any_element(stored, |v| p.is_match(v)),
            Condition::In(ops) => any_element(stored, |v| ops.iter().any(|op| op.equals_stored(v))),
            Condition::NotIn(ops) => {
                !any_element(stored, |v| ops.iter().any(|op| op.equals_stored(v)))
            }
            Condition::Range { min, max } => any_element(stored, |v| in_range(v, min, max)),
            Condition::NotRange { min, max } => !any_element(stored, |v| in_range(v, min, max)),
        }
    }

    fn to_json(&self) -> Value {
        let list = |ops: &[Operand]| Value::Array(ops.iter().map(Operand::to_json).collect());
        match self {
            Condition::Exists(b) => json!({ "$exists": b }),
            Condition::Eq(op) => json!({ "$eq": op.to_json() }),
            Condition::Ne(op) => json!({ "$ne": op.to_json() }),
            Condition::Gt(op) => json!({ "$gt": op.to_json() }),
            Condition::Gte(op) => json!({ "$gte": op.to_json() }),
            Condition::Lt(op) => json!({ "$lt": op.to_json() }),
            Condition::Lte(op) => json!({ "$lte": op.to_json() }),
            Condition::Matches(p) => p.to_json(),
            Condition::NotMatches(p) => json!({ "$not": p.to_json() }),
            Condition::In(ops) => json!({ "$in": list(ops) }),
            Condition::NotIn(ops) => json!({ "$nin": list(ops) }),
            Condition::Range { min, max } => {
                json!({ "$gte": min.to_json(), "$lte": max.to_json() })
            }
            Condition::NotRange { min, max } => {
                json!({ "$not": { "$gte": min.to_json(), "$lte": max.to_json() } })
            }
        }
    }
}

fn in_range(stored: &Value, min: &Operand, max: &Operand) -> bool {
    matches!(min.compare_stored(stored), Some(Ordering::Greater | Ordering::Equal))
        && matches!(max.compare_stored(stored), Some(Ordering::Less | Ordering::Equal))
}

/// Applies `test` to the stored value, or to each element of a stored array.
fn any_element(stored: Option<&Value>, test: impl Fn(&Value) -> bool) -> bool {
    match stored {
        None => false,
        Some(value) => {
            test(value) || matches!(value, Value::Array(items) if items.iter().any(|item| test(item)))
        }
    }
}

/// Condition bound to a normalized field path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub path: String,
    pub condition: Condition,
}

/// Compiled predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum NativePredicate {
    /// Matches every document
    Empty,
    And(Vec<NativePredicate>),
    Or(Vec<NativePredicate>),
    Field(FieldCondition),
}

impl NativePredicate {
    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        NativePredicate::Field(FieldCondition {
            path: path.into(),
            condition,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NativePredicate::Empty)
    }

    /// Check if a document matches this predicate
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            NativePredicate::Empty => true,
            NativePredicate::And(children) => children.iter().all(|c| c.matches(document)),
            NativePredicate::Or(children) => children.iter().any(|c| c.matches(document)),
            NativePredicate::Field(fc) => {
                let stored = resolve_path(document, &fc.path);
                fc.condition.evaluate(stored.as_deref())
            }
        }
    }

    /// Match-document rendering for explain output
    pub fn to_json(&self) -> Value {
        match self {
            NativePredicate::Empty => json!({}),
            NativePredicate::And(children) => {
                json!({ "$and": children.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            NativePredicate::Or(children) => {
                json!({ "$or": children.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            NativePredicate::Field(fc) => {
                let mut body = Map::new();
                body.insert(fc.path.clone(), fc.condition.to_json());
                Value::Object(body)
            }
        }
    }
}
