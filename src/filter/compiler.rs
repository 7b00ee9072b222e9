//! Filter compilation
//!
//! Lowers a [`FilterNode`] into a [`NativePredicate`]. Compilation is pure:
//! the same tree always yields a structurally equal predicate.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{Combinator, CombinatorKind, FilterNode, FilterOperator, Predicate};
use super::errors::{FilterError, FilterResult};
use super::native::{Condition, NativePredicate, Operand, Pattern};
use super::normalize::{
    coerce_list, coerce_scalar, field_kind, is_blank, normalize_path, FieldKind,
};

/// Compiles filter trees into native predicates
pub struct FilterCompiler;

impl FilterCompiler {
    /// Compile a filter tree.
    pub fn compile(node: &FilterNode) -> FilterResult<NativePredicate> {
        match node {
            FilterNode::Leaf(predicate) => Self::compile_leaf(predicate),
            FilterNode::Combinator(combinator) => Self::compile_combinator(combinator),
        }
    }

    /// Compile an optional filter; absence is the empty predicate.
    pub fn compile_optional(node: Option<&FilterNode>) -> FilterResult<NativePredicate> {
        node.map_or(Ok(NativePredicate::Empty), Self::compile)
    }

    fn compile_combinator(combinator: &Combinator) -> FilterResult<NativePredicate> {
        let mut compiled = Vec::with_capacity(combinator.children().len());
        for child in combinator.children() {
            let predicate = Self::compile(child)?;
            if !predicate.is_empty() {
                compiled.push(predicate);
            }
        }

        Ok(match compiled.len() {
            0 => NativePredicate::Empty,
            1 => compiled.remove(0),
            _ => match combinator.kind() {
                CombinatorKind::And => NativePredicate::And(compiled),
                CombinatorKind::Or => NativePredicate::Or(compiled),
            },
        })
    }

    fn compile_leaf(predicate: &Predicate) -> FilterResult<NativePredicate> {
        if is_blank(&predicate.value) {
            return Ok(NativePredicate::Empty);
        }

        let path = normalize_path(&predicate.field);
        let op = predicate.operator;
        let name = op.as_str();
        let value = &predicate.value;

        let condition = match op {
            FilterOperator::Is | FilterOperator::IsNot => {
                let expected = value.as_bool().ok_or_else(|| {
                    FilterError::invalid_value(&path, name, "expected a boolean")
                })?;
                Condition::Exists(if op == FilterOperator::Is {
                    expected
                } else {
                    !expected
                })
            }
            FilterOperator::Eq => Condition::Eq(scalar(&path, name, value)?),
            FilterOperator::Neq => Condition::Ne(scalar(&path, name, value)?),
            FilterOperator::Gt => Condition::Gt(scalar(&path, name, value)?),
            FilterOperator::Gte => Condition::Gte(scalar(&path, name, value)?),
            FilterOperator::Lt => Condition::Lt(scalar(&path, name, value)?),
            FilterOperator::Lte => Condition::Lte(scalar(&path, name, value)?),
            FilterOperator::Like
            | FilterOperator::NotLike
            | FilterOperator::ILike
            | FilterOperator::NotILike => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| FilterError::invalid_value(&path, name, "expected a string"))?;
                let text = raw.replace('%', "");
                if text.is_empty() {
                    return Ok(NativePredicate::Empty);
                }
                let case_insensitive =
                    matches!(op, FilterOperator::ILike | FilterOperator::NotILike);
                let pattern = Pattern::literal(&text, case_insensitive)
                    .map_err(|e| FilterError::invalid_value(&path, name, e.to_string()))?;
                if matches!(op, FilterOperator::Like | FilterOperator::ILike) {
                    Condition::Matches(pattern)
                } else {
                    Condition::NotMatches(pattern)
                }
            }
            FilterOperator::In => Condition::In(coerce_list(&path, name, value)?),
            FilterOperator::NotIn => Condition::NotIn(coerce_list(&path, name, value)?),
            FilterOperator::Between | FilterOperator::NotBetween => {
                if blank_bound(value) {
                    return Ok(NativePredicate::Empty);
                }
                let (min, max) = bounds(&path, name, value)?;
                if op == FilterOperator::Between {
                    Condition::Range { min, max }
                } else {
                    Condition::NotRange { min, max }
                }
            }
        };

        Ok(NativePredicate::field(path, condition))
    }
}

/// Scalar operators take a single coerced operand. Lists are only accepted
/// on plain fields, where they compare as whole arrays.
fn scalar(path: &str, operator: &str, value: &Value) -> FilterResult<Operand> {
    match (value, field_kind(path)) {
        (Value::Array(_), FieldKind::Plain) => Ok(Operand::Json(value.clone())),
        (Value::Array(_), _) => Err(FilterError::invalid_value(
            path,
            operator,
            "expected a single value",
        )),
        _ => coerce_scalar(path, operator, value),
    }
}

/// A well-formed range with a blank side constrains nothing.
fn blank_bound(value: &Value) -> bool {
    match value.as_array() {
        Some(items) => items.len() == 2 && items.iter().any(is_blank),
        None => false,
    }
}

/// Orders the two range bounds by value, so `[100, 10]` means `10..=100`.
fn bounds(path: &str, operator: &str, value: &Value) -> FilterResult<(Operand, Operand)> {
    let mut operands = coerce_list(path, operator, value)?;
    if operands.len() != 2 {
        return Err(FilterError::invalid_value(
            path,
            operator,
            format!("expected exactly two bounds, got {}", operands.len()),
        ));
    }

    let second = operands.pop();
    let first = operands.pop();
    let (Some(first), Some(second)) = (first, second) else {
        return Err(FilterError::invalid_value(path, operator, "missing bound"));
    };

    match first.compare_operand(&second) {
        Some(Ordering::Greater) => Ok((second, first)),
        Some(_) => Ok((first, second)),
        None => Err(FilterError::invalid_value(
            path,
            operator,
            "bounds are not comparable",
        )),
    }
}
