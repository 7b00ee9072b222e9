//! Entity descriptors
//!
//! Everything the gateway needs to know about one entity: where it lives,
//! which relation stages every read runs, what the audit trail may see and
//! which values a create implies.

use serde_json::{Map, Value};

use crate::query::Stage;

/// Declarative description of one CRM entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Catalog key, e.g. `deals`
    pub name: String,
    /// Name written to `targetEntity`, e.g. `Deal`
    pub audit_name: String,
    pub collection: String,
    /// Lookup and derive stages prepended to every read
    pub relations: Vec<Stage>,
    /// Fields the audit trail may record; `None` means all
    pub public_fields: Option<Vec<String>>,
    /// Values a create implies when the payload omits them
    pub create_defaults: Map<String, Value>,
    /// Recompute quote totals on update
    pub pricing: bool,
    /// Mirror mutations into the audit trail
    pub audited: bool,
    /// Reject every write through the gateway
    pub read_only: bool,
}

impl EntityDescriptor {
    /// Descriptor with no relations, defaults or field restrictions.
    pub fn new(
        name: impl Into<String>,
        audit_name: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            audit_name: audit_name.into(),
            collection: collection.into(),
            relations: Vec::new(),
            public_fields: None,
            create_defaults: Map::new(),
            pricing: false,
            audited: true,
            read_only: false,
        }
    }

    pub fn with_relation(mut self, stage: impl Into<Stage>) -> Self {
        self.relations.push(stage.into());
        self
    }

    pub fn with_public_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.public_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, field: impl Into<String>, value: Value) -> Self {
        self.create_defaults.insert(field.into(), value);
        self
    }

    pub fn with_pricing(mut self) -> Self {
        self.pricing = true;
        self
    }

    /// Readable through the gateway but never written by it. Nothing is
    /// written, so nothing is audited either.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self.audited = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Derive, Lookup};
    use serde_json::json;

    #[test]
    fn test_builder() {
        let descriptor = EntityDescriptor::new("dealStages", "DealStage", "dealstages")
            .with_relation(Lookup::many("deals", "_id", "stageId", "dealsAggregate.nodes"))
            .with_relation(Derive::Sum {
                source: "dealsAggregate.nodes".into(),
                field: "value".into(),
                target: "dealsAggregate.sum.value".into(),
            })
            .with_default("title", json!("NEW"));

        assert_eq!(descriptor.relations.len(), 2);
        assert!(descriptor.relations.iter().all(Stage::is_relation));
        assert_eq!(descriptor.create_defaults["title"], "NEW");
        assert!(!descriptor.pricing);
        assert!(descriptor.audited);
        assert!(!descriptor.read_only);
        assert_eq!(descriptor.public_fields, None);

        let audits = EntityDescriptor::new("audits", "Audit", "audits").read_only();
        assert!(audits.read_only);
        assert!(!audits.audited);
    }
}
