//! Engine pipeline stages
//!
//! A pipeline is an ordered list of stages evaluated against one collection:
//! relation lookups and derived fields first, then match, sort and window.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::filter::NativePredicate;

use super::sort::NativeSort;

/// How many joined documents a lookup keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// First match, or null
    One,
    /// Every match, as an array
    Many,
}

/// Join documents from another collection into `as_field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    #[serde(rename = "as")]
    pub as_field: String,
    pub cardinality: Cardinality,
}

impl Lookup {
    /// Single related document, e.g. a deal's company
    pub fn one(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
            cardinality: Cardinality::One,
        }
    }

    /// Related document list, e.g. a company's contacts
    pub fn many(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..Self::one(from, local_field, foreign_field, as_field)
        }
    }
}

/// Computed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Derive {
    /// Length of the array at `source`
    Size { source: String, target: String },
    /// Sum of `field` over the documents in the array at `source`
    Sum {
        source: String,
        field: String,
        target: String,
    },
}

/// One engine stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Lookup(Lookup),
    Derive(Derive),
    Match(NativePredicate),
    Sort(NativeSort),
    Limit(u64),
    Skip(u64),
}

impl Stage {
    /// True for stages that add fields without removing documents
    pub fn is_relation(&self) -> bool {
        matches!(self, Stage::Lookup(_) | Stage::Derive(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Stage::Lookup(lookup) => json!({
                "$lookup": {
                    "from": lookup.from,
                    "localField": lookup.local_field,
                    "foreignField": lookup.foreign_field,
                    "as": lookup.as_field,
                    "cardinality": lookup.cardinality,
                }
            }),
            Stage::Derive(Derive::Size { source, target }) => {
                json!({ "$addFields": { target.as_str(): { "$size": format!("${}", source) } } })
            }
            Stage::Derive(Derive::Sum {
                source,
                field,
                target,
            }) => json!({
                "$addFields": { target.as_str(): { "$sum": format!("${}.{}", source, field) } }
            }),
            Stage::Match(predicate) => json!({ "$match": predicate.to_json() }),
            Stage::Sort(sort) => json!({ "$sort": sort.to_json() }),
            Stage::Limit(n) => json!({ "$limit": n }),
            Stage::Skip(n) => json!({ "$skip": n }),
        }
    }
}

impl From<Lookup> for Stage {
    fn from(lookup: Lookup) -> Self {
        Stage::Lookup(lookup)
    }
}

impl From<Derive> for Stage {
    fn from(derive: Derive) -> Self {
        Stage::Derive(derive)
    }
}

/// Ordered stage list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn extend(&mut self, stages: impl IntoIterator<Item = Stage>) {
        self.stages.extend(stages);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_json).collect())
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}
