//! Built-in CRM entity catalog
//!
//! Collections and relation stages for every entity the CRM exposes.
//! Reads join the same related records for filtering and display:
//! a deal carries its company, stage, contact and owner; a company carries
//! its sales owner, contacts and deal value total.

use std::collections::BTreeMap;

use serde_json::json;

use crate::query::{Derive, Lookup};

use super::descriptor::EntityDescriptor;
use super::errors::{GatewayError, GatewayResult};

/// Registry of entity descriptors keyed by entity name
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a descriptor.
    pub fn register(&mut self, descriptor: EntityDescriptor) {
        self.entities.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> GatewayResult<&EntityDescriptor> {
        self.entities
            .get(name)
            .ok_or_else(|| GatewayError::UnknownEntity(name.to_string()))
    }

    /// Entity names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }

    /// The CRM entity set
    pub fn crm() -> Self {
        let mut catalog = Self::new();
        for descriptor in crm_entities() {
            catalog.register(descriptor);
        }
        catalog
    }
}

fn owner(field: &str, as_field: &str) -> Lookup {
    Lookup::one("users", field, "_id", as_field)
}

fn crm_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("audits", "Audit", "audits")
            .with_relation(owner("userId", "user"))
            .read_only(),
        EntityDescriptor::new("companies", "Company", "companies")
            .with_relation(owner("salesOwnerId", "salesOwner"))
            .with_relation(Lookup::many("contacts", "_id", "companyId", "contacts.nodes"))
            .with_relation(Derive::Size {
                source: "contacts.nodes".into(),
                target: "contacts.totalCount".into(),
            })
            .with_relation(Lookup::many("deals", "_id", "companyId", "dealsAggregate.nodes"))
            .with_relation(Derive::Sum {
                source: "dealsAggregate.nodes".into(),
                field: "value".into(),
                target: "dealsAggregate.sum.value".into(),
            }),
        EntityDescriptor::new("companyNotes", "CompanyNote", "companynotes")
            .with_relation(Lookup::one("companies", "companyId", "_id", "company"))
            .with_relation(owner("createdById", "createdBy")),
        EntityDescriptor::new("contacts", "Contact", "contacts")
            .with_relation(Lookup::one("companies", "companyId", "_id", "company"))
            .with_relation(owner("salesOwnerId", "salesOwner"))
            .with_default("stage", json!("LEAD"))
            .with_default("status", json!("NEW")),
        EntityDescriptor::new("contactNotes", "ContactNote", "contactnotes")
            .with_relation(Lookup::one("contacts", "contactId", "_id", "contact"))
            .with_relation(owner("createdById", "createdBy")),
        EntityDescriptor::new("deals", "Deal", "deals")
            .with_relation(Lookup::one("companies", "companyId", "_id", "company"))
            .with_relation(Lookup::one("dealstages", "stageId", "_id", "stage"))
            .with_relation(Lookup::one("contacts", "dealContactId", "_id", "dealContact"))
            .with_relation(owner("dealOwnerId", "dealOwner")),
        EntityDescriptor::new("dealStages", "DealStage", "dealstages")
            .with_relation(Lookup::many("deals", "_id", "stageId", "dealsAggregate.nodes"))
            .with_relation(Derive::Sum {
                source: "dealsAggregate.nodes".into(),
                field: "value".into(),
                target: "dealsAggregate.sum.value".into(),
            }),
        EntityDescriptor::new("events", "Event", "events")
            .with_relation(Lookup::one("eventcategories", "categoryId", "_id", "category"))
            .with_relation(owner("createdById", "createdBy"))
            .with_relation(Lookup::many("users", "participantIds", "_id", "participants")),
        EntityDescriptor::new("eventCategories", "EventCategory", "eventcategories"),
        EntityDescriptor::new("quotes", "Quote", "quotes")
            .with_relation(Lookup::one("companies", "companyId", "_id", "company"))
            .with_relation(Lookup::one("contacts", "contactId", "_id", "contact"))
            .with_relation(owner("salesOwnerId", "salesOwner"))
            .with_default("total", json!(0))
            .with_default("subTotal", json!(0))
            .with_default("tax", json!(0))
            .with_default("status", json!("DRAFT"))
            .with_pricing(),
        EntityDescriptor::new("tasks", "Task", "tasks")
            .with_relation(Lookup::many("users", "userIds", "_id", "users"))
            .with_relation(Lookup::many("taskcomments", "_id", "taskId", "comments.nodes"))
            .with_relation(Derive::Size {
                source: "comments.nodes".into(),
                target: "comments.totalCount".into(),
            })
            .with_relation(Lookup::one("taskstages", "stageId", "_id", "stage"))
            .with_default("completed", json!(false)),
        EntityDescriptor::new("taskComments", "TaskComment", "taskcomments")
            .with_relation(Lookup::one("tasks", "taskId", "_id", "task"))
            .with_relation(owner("createdById", "createdBy")),
        EntityDescriptor::new("taskStages", "TaskStage", "taskstages")
            .with_relation(Lookup::many("tasks", "_id", "stageId", "tasksAggregate.nodes"))
            .with_relation(Derive::Size {
                source: "tasksAggregate.nodes".into(),
                target: "tasksAggregate.count.id".into(),
            }),
        EntityDescriptor::new("users", "User", "users").with_public_fields([
            "name",
            "email",
            "phone",
            "jobTitle",
            "timezone",
            "role",
            "avatarUrl",
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Stage;

    #[test]
    fn test_crm_catalog() {
        let catalog = EntityCatalog::crm();
        assert_eq!(catalog.names().len(), 14);
        assert!(catalog.names().contains(&"deals"));

        let deals = catalog.get("deals").unwrap();
        assert_eq!(deals.audit_name, "Deal");
        assert_eq!(deals.relations.len(), 4);
        assert!(deals.relations.iter().all(Stage::is_relation));

        assert!(catalog.get("quotes").unwrap().pricing);
        assert!(catalog.get("audits").unwrap().read_only);
        assert_eq!(catalog.get("contacts").unwrap().create_defaults["stage"], "LEAD");
    }

    #[test]
    fn test_user_password_is_private() {
        let catalog = EntityCatalog::crm();
        let fields = catalog.get("users").unwrap().public_fields.clone().unwrap();
        assert!(fields.iter().any(|f| f == "email"));
        assert!(!fields.iter().any(|f| f == "password"));
    }

    #[test]
    fn test_unknown_entity() {
        let err = EntityCatalog::crm().get("invoices").unwrap_err();
        assert_eq!(err.code(), "CRM_GATEWAY_UNKNOWN_ENTITY");
    }
}
