//! # Filter Wire Parser
//!
//! Parses the loosely-typed JSON filter object into a [`FilterNode`].
//!
//! Wire shape:
//! - `{"and": [...]}` / `{"or": [...]}` combine nested filter objects
//! - `{"field": {"op": value}}` is a leaf
//! - `{"relation": {"field": {"op": value}}}` flattens to `relation.field`
//! - Several keys in one object combine under AND

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::observability::{log_event_with_fields, Event};

use super::ast::{CombinatorKind, FilterNode, FilterOperator};
use super::errors::{FilterError, FilterResult};

/// Handling of operators outside the supported table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorPolicy {
    /// Reject the whole filter
    #[default]
    Strict,
    /// Drop the leaf and log a warning
    Lenient,
}

/// Wire filter parser
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterParser {
    policy: OperatorPolicy,
}

impl FilterParser {
    pub fn new(policy: OperatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OperatorPolicy {
        self.policy
    }

    /// Parse a wire filter.
    ///
    /// Returns `Ok(None)` when the filter places no constraint (`null`, `{}`,
    /// empty combinator lists, or only ignored operators).
    pub fn parse(&self, value: &Value) -> FilterResult<Option<FilterNode>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => self.parse_object(map),
            other => Err(FilterError::invalid_filter(format!(
                "expected an object, got {}",
                json_type(other)
            ))),
        }
    }

    fn parse_object(&self, map: &Map<String, Value>) -> FilterResult<Option<FilterNode>> {
        let mut nodes = Vec::new();

        for (key, value) in map {
            match key.as_str() {
                "and" => self.parse_combinator(CombinatorKind::And, value, &mut nodes)?,
                "or" => self.parse_combinator(CombinatorKind::Or, value, &mut nodes)?,
                field => self.parse_field(field, value, &mut nodes)?,
            }
        }

        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => FilterNode::and(nodes),
        })
    }

    fn parse_combinator(
        &self,
        kind: CombinatorKind,
        value: &Value,
        out: &mut Vec<FilterNode>,
    ) -> FilterResult<()> {
        let items = value.as_array().ok_or_else(|| {
            FilterError::invalid_filter(format!("'{}' must map to a list of filters", kind.as_str()))
        })?;

        let mut children = Vec::with_capacity(items.len());
        for item in items {
            if let Some(child) = self.parse(item)? {
                children.push(child);
            }
        }

        if let Some(node) = FilterNode::combine(kind, children) {
            out.push(node);
        }
        Ok(())
    }

    fn parse_field(&self, path: &str, value: &Value, out: &mut Vec<FilterNode>) -> FilterResult<()> {
        let operators = value.as_object().ok_or_else(|| {
            FilterError::invalid_filter(format!("field '{}' must map to an operator object", path))
        })?;

        for (key, operand) in operators {
            if let Some(op) = FilterOperator::from_name(key) {
                out.push(FilterNode::leaf(path, op, operand.clone()));
                continue;
            }

            // Relation sub-filter: {"company": {"name": {"eq": ..}}}
            if operand.is_object() {
                self.parse_field(&format!("{}.{}", path, key), operand, out)?;
                continue;
            }

            match self.policy {
                OperatorPolicy::Strict => {
                    return Err(FilterError::InvalidOperator {
                        field: path.to_string(),
                        operator: key.clone(),
                    });
                }
                OperatorPolicy::Lenient => {
                    log_event_with_fields(
                        Event::FilterOperatorIgnored,
                        &[("field", path), ("operator", key.as_str())],
                    );
                }
            }
        }
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
