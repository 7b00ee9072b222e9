//! # Filter Tree
//!
//! Typed representation of a filter request. The wire object is parsed into
//! this tree once, at the boundary; everything downstream works on the tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Field exists (value `true`) or is absent (value `false`)
    #[serde(rename = "is")]
    Is,

    /// Negation of `is`
    #[serde(rename = "isNot")]
    IsNot,

    /// Equals
    #[serde(rename = "eq")]
    Eq,

    /// Not equals
    #[serde(rename = "neq")]
    Neq,

    /// Greater than
    #[serde(rename = "gt")]
    Gt,

    /// Greater than or equal
    #[serde(rename = "gte")]
    Gte,

    /// Less than
    #[serde(rename = "lt")]
    Lt,

    /// Less than or equal
    #[serde(rename = "lte")]
    Lte,

    /// Case-sensitive substring match
    #[serde(rename = "like")]
    Like,

    /// Negated `like`
    #[serde(rename = "notLike")]
    NotLike,

    /// Case-insensitive substring match
    #[serde(rename = "iLike")]
    ILike,

    /// Negated `iLike`
    #[serde(rename = "notILike")]
    NotILike,

    /// Value in list
    #[serde(rename = "in")]
    In,

    /// Value not in list
    #[serde(rename = "notIn")]
    NotIn,

    /// Inclusive two-element range
    #[serde(rename = "between")]
    Between,

    /// Outside an inclusive two-element range
    #[serde(rename = "notBetween")]
    NotBetween,
}

impl FilterOperator {
    /// Every supported operator, in wire-table order
    pub const ALL: [FilterOperator; 16] = [
        FilterOperator::Is,
        FilterOperator::IsNot,
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Like,
        FilterOperator::NotLike,
        FilterOperator::ILike,
        FilterOperator::NotILike,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Between,
        FilterOperator::NotBetween,
    ];

    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Is => "is",
            FilterOperator::IsNot => "isNot",
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::NotLike => "notLike",
            FilterOperator::ILike => "iLike",
            FilterOperator::NotILike => "notILike",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::Between => "between",
            FilterOperator::NotBetween => "notBetween",
        }
    }

    /// Look up an operator by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Returns true for the substring operators
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            FilterOperator::Like
                | FilterOperator::NotLike
                | FilterOperator::ILike
                | FilterOperator::NotILike
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (field, operator, value) condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Dotted field path as sent by the caller
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Raw operand
    pub value: Value,
}

impl Predicate {
    /// Create a new predicate
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Logical combinator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinatorKind {
    And,
    Or,
}

impl CombinatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombinatorKind::And => "and",
            CombinatorKind::Or => "or",
        }
    }
}

/// A logical combination of at least one child node
#[derive(Debug, Clone, PartialEq)]
pub struct Combinator {
    kind: CombinatorKind,
    children: Vec<FilterNode>,
}

impl Combinator {
    pub fn kind(&self) -> CombinatorKind {
        self.kind
    }

    pub fn children(&self) -> &[FilterNode] {
        &self.children
    }
}

/// Filter tree node
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(Predicate),
    Combinator(Combinator),
}

impl FilterNode {
    /// Create a leaf node
    pub fn leaf(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        FilterNode::Leaf(Predicate::new(field, operator, value))
    }

    /// Combine children under `kind`.
    ///
    /// Returns `None` for an empty child list, so a combinator always holds
    /// at least one child.
    pub fn combine(kind: CombinatorKind, children: Vec<FilterNode>) -> Option<Self> {
        if children.is_empty() {
            return None;
        }
        Some(FilterNode::Combinator(Combinator { kind, children }))
    }

    /// AND of the given children
    pub fn and(children: Vec<FilterNode>) -> Option<Self> {
        Self::combine(CombinatorKind::And, children)
    }

    /// OR of the given children
    pub fn or(children: Vec<FilterNode>) -> Option<Self> {
        Self::combine(CombinatorKind::Or, children)
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            FilterNode::Leaf(_) => 1,
            FilterNode::Combinator(c) => c.children.iter().map(FilterNode::leaf_count).sum(),
        }
    }
}
