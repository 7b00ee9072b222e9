//! Field-level change sets
//!
//! Values are rendered to strings before they enter the audit trail:
//! - strings verbatim
//! - numbers and booleans through their JSON text
//! - `null` as an absent value
//! - arrays of scalars comma-joined
//! - objects as compact JSON
//!
//! Arrays of objects (checklists, quote items) diff element by element on
//! update, one entry per `(index, sub-field)` named `list.<index>.<field>`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One before/after pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl ChangeEntry {
    /// Entry for a newly set field; `from` is absent
    pub fn created(field: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            from: None,
            to: Some(to.into()),
        }
    }

    pub fn updated(field: impl Into<String>, from: Option<String>, to: Option<String>) -> Self {
        Self {
            field: field.into(),
            from,
            to,
        }
    }
}

/// Computes change sets for create and update mutations
#[derive(Debug, Clone, Default)]
pub struct ChangeSetBuilder {
    public_fields: Option<Vec<String>>,
}

impl ChangeSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts change sets to these top-level fields.
    pub fn with_public_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.public_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    fn is_public(&self, field: &str) -> bool {
        match &self.public_fields {
            None => true,
            Some(fields) => fields.iter().any(|f| f == field),
        }
    }

    /// One entry per supplied field, in payload order.
    pub fn diff_for_create(&self, values: &Map<String, Value>) -> Vec<ChangeEntry> {
        values
            .iter()
            .filter(|(field, _)| self.is_public(field))
            .map(|(field, value)| ChangeEntry {
                field: field.clone(),
                from: None,
                to: render(value),
            })
            .collect()
    }

    /// Like [`diff_for_create`](Self::diff_for_create), preceded by entries
    /// for implied defaults the payload did not supply.
    pub fn diff_for_create_with_defaults(
        &self,
        defaults: &Map<String, Value>,
        values: &Map<String, Value>,
    ) -> Vec<ChangeEntry> {
        let implied: Map<String, Value> = defaults
            .iter()
            .filter(|(field, _)| !values.contains_key(*field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        let mut changes = self.diff_for_create(&implied);
        changes.extend(self.diff_for_create(values));
        changes
    }

    /// One entry per field in `values`, with `from` taken from `old`.
    ///
    /// Without a prior snapshot the result is the create diff.
    pub fn diff_for_update(&self, old: Option<&Value>, values: &Map<String, Value>) -> Vec<ChangeEntry> {
        let Some(old) = old else {
            return self.diff_for_create(values);
        };

        let mut changes = Vec::with_capacity(values.len());
        for (field, value) in values {
            if !self.is_public(field) {
                continue;
            }
            let previous = old.get(field);

            match as_record_list(value) {
                Some(records) => {
                    let prior = previous.and_then(Value::as_array);
                    for (index, record) in records.iter().enumerate() {
                        let prior_record = prior.and_then(|items| items.get(index));
                        for (sub, sub_value) in record.iter() {
                            let from = match prior_record {
                                None => Some(String::new()),
                                Some(item) => item.get(sub).and_then(render),
                            };
                            changes.push(ChangeEntry {
                                field: format!("{}.{}.{}", field, index, sub),
                                from,
                                to: render(sub_value),
                            });
                        }
                    }
                }
                None => changes.push(ChangeEntry {
                    field: field.clone(),
                    from: previous.and_then(render),
                    to: render(value),
                }),
            }
        }
        changes
    }
}

/// Non-empty array whose elements are all objects
fn as_record_list(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    let items = value.as_array().filter(|items| !items.is_empty())?;
    items.iter().map(Value::as_object).collect()
}

/// Renders a value for the audit trail; `None` means absent.
pub fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if items.iter().all(is_scalar) => Some(
            items
                .iter()
                .filter_map(render)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
