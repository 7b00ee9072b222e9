//! Generic entity gateway
//!
//! One CRUD surface for every catalog entity. Reads go through the query
//! executor with the entity's relation stages. Writes go to the document
//! store first and are mirrored into the audit trail afterwards.
//!
//! # Write path (strict order)
//!
//! 1. Validate the payload (every payload, for batch creates)
//! 2. Write the document
//! 3. Diff and record the audit entry
//!
//! A failed step 3 does not undo step 2. It is reported on the returned
//! [`Mutation`], logged and counted.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::audit::{
    format_timestamp, now, AuditAction, AuditRecord, AuditRecorder, AuditResult, ChangeSetBuilder,
};
use crate::filter::{
    Condition, FilterCompiler, FilterNode, FilterParser, NativePredicate, Operand, OperatorPolicy,
};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::query::{
    Connection, PagingCompiler, Pipeline, Query, QueryExecutor, QueryPlan, QueryRequest, Stage,
};
use crate::store::{document_id, DocumentStore, PRIMARY_KEY};

use super::descriptor::EntityDescriptor;
use super::errors::{GatewayError, GatewayResult};
use super::pricing::apply_quote_pricing;

/// Outcome of one committed write
#[derive(Debug)]
pub struct Mutation {
    /// Document as written
    pub node: Value,
    /// Audit outcome; `None` for unaudited entities
    pub audit: Option<AuditResult<AuditRecord>>,
}

impl Mutation {
    /// True when the write committed but its audit record was lost
    pub fn is_unaudited(&self) -> bool {
        matches!(self.audit, Some(Err(_)))
    }

    pub fn to_json(&self) -> Value {
        let audit = match &self.audit {
            None => Value::Null,
            Some(Ok(record)) => serde_json::to_value(record).unwrap_or(Value::Null),
            Some(Err(e)) => json!({ "error": { "code": e.code(), "message": e.to_string() } }),
        };
        json!({ "node": self.node, "audit": audit })
    }
}

/// Descriptor-driven CRUD over a document store
pub struct EntityGateway<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    audit: Arc<AuditRecorder>,
    metrics: Arc<MetricsRegistry>,
    parser: FilterParser,
    paging: PagingCompiler,
}

impl<S: DocumentStore + ?Sized> EntityGateway<S> {
    /// Gateway sharing the recorder's metrics registry.
    pub fn new(store: Arc<S>, audit: Arc<AuditRecorder>) -> Self {
        let metrics = Arc::clone(audit.metrics());
        Self {
            store,
            audit,
            metrics,
            parser: FilterParser::default(),
            paging: PagingCompiler::default(),
        }
    }

    pub fn with_operator_policy(mut self, policy: OperatorPolicy) -> Self {
        self.parser = FilterParser::new(policy);
        self
    }

    pub fn with_max_limit(mut self, max_limit: u64) -> Self {
        self.paging = PagingCompiler::new(max_limit);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn audit(&self) -> &Arc<AuditRecorder> {
        &self.audit
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Parses a wire request under the configured operator policy.
    pub fn parse_request(&self, request: QueryRequest) -> GatewayResult<Query> {
        Ok(request.into_query(&self.parser)?)
    }

    fn executor(&self) -> QueryExecutor<'_, S> {
        QueryExecutor::new(self.store.as_ref(), self.paging)
    }

    /// Compiles a query without running it.
    pub fn plan(&self, entity: &EntityDescriptor, query: &Query) -> GatewayResult<QueryPlan> {
        Ok(self.executor().plan(query, &entity.relations)?)
    }

    /// Filtered, sorted, paged read.
    pub fn find(&self, entity: &EntityDescriptor, query: &Query) -> GatewayResult<Connection> {
        match self
            .executor()
            .execute(&entity.collection, query, &entity.relations)
        {
            Ok(connection) => {
                self.metrics.increment_queries_executed();
                self.metrics.add_rows_returned(connection.nodes.len() as u64);
                Ok(connection)
            }
            Err(e) => {
                self.metrics.increment_queries_rejected();
                Err(e.into())
            }
        }
    }

    /// Single document with its relations.
    pub fn find_one(&self, entity: &EntityDescriptor, id: &Uuid) -> GatewayResult<Option<Value>> {
        let mut pipeline = Pipeline::from(entity.relations.clone());
        pipeline.push(Stage::Match(NativePredicate::field(
            PRIMARY_KEY,
            Condition::Eq(Operand::Id(*id)),
        )));
        pipeline.push(Stage::Limit(1));

        Ok(self
            .store
            .aggregate(&entity.collection, &pipeline)?
            .into_iter()
            .next())
    }

    /// Inserts one document and records a CREATE entry.
    ///
    /// Omitted fields with a create default take it; `createdById`,
    /// `createdAt` and `updatedAt` are stamped.
    pub fn create_one(
        &self,
        entity: &EntityDescriptor,
        values: Value,
        user_id: Uuid,
    ) -> GatewayResult<Mutation> {
        writable(entity)?;
        let values = payload(values)?;
        self.insert(entity, values, user_id)
    }

    /// Inserts documents in order. Every payload is validated before the
    /// first insert, so a rejected batch writes nothing.
    pub fn create_many(
        &self,
        entity: &EntityDescriptor,
        values: Vec<Value>,
        user_id: Uuid,
    ) -> GatewayResult<Vec<Mutation>> {
        writable(entity)?;
        let payloads = values
            .into_iter()
            .map(payload)
            .collect::<GatewayResult<Vec<_>>>()?;
        payloads
            .into_iter()
            .map(|values| self.insert(entity, values, user_id))
            .collect()
    }

    fn insert(
        &self,
        entity: &EntityDescriptor,
        values: Map<String, Value>,
        user_id: Uuid,
    ) -> GatewayResult<Mutation> {
        let id = Uuid::new_v4();
        let stamp = Value::String(format_timestamp(&now()));

        let mut document = Map::new();
        document.insert(PRIMARY_KEY.into(), Value::String(id.to_string()));
        for (field, value) in &entity.create_defaults {
            if !values.contains_key(field) {
                document.insert(field.clone(), value.clone());
            }
        }
        for (field, value) in &values {
            document.insert(field.clone(), value.clone());
        }
        document.insert("createdById".into(), Value::String(user_id.to_string()));
        document.insert("createdAt".into(), stamp.clone());
        document.insert("updatedAt".into(), stamp);

        let node = self.store.insert(&entity.collection, Value::Object(document))?;
        self.metrics.add_entities_created(1);
        log_write(Event::EntityCreated, entity, &id, &user_id);

        let audit = entity.audited.then(|| {
            let changes = changeset(entity).diff_for_create_with_defaults(&entity.create_defaults, &values);
            self.audit
                .record(&entity.audit_name, id, changes, user_id, AuditAction::Create)
        });
        Ok(Mutation { node, audit })
    }

    /// Merges a patch into one document and records an UPDATE entry.
    ///
    /// Blank (`""`) values are dropped from the patch. Quote entities get
    /// their totals recomputed. `updatedById` and `updatedAt` are stamped.
    pub fn update_one(
        &self,
        entity: &EntityDescriptor,
        id: &Uuid,
        patch: Value,
        user_id: Uuid,
    ) -> GatewayResult<Mutation> {
        writable(entity)?;
        let mut patch = payload(patch)?;
        patch.retain(|_, value| value.as_str() != Some(""));

        let previous = self
            .store
            .get(&entity.collection, id)?
            .ok_or_else(|| not_found(entity, id))?;

        if entity.pricing {
            apply_quote_pricing(Some(&previous), &mut patch);
        }
        let changes = entity
            .audited
            .then(|| changeset(entity).diff_for_update(Some(&previous), &patch));

        patch.insert("updatedById".into(), Value::String(user_id.to_string()));
        patch.insert("updatedAt".into(), Value::String(format_timestamp(&now())));

        let node = self
            .store
            .update(&entity.collection, id, &patch)?
            .ok_or_else(|| not_found(entity, id))?;
        self.metrics.add_entities_updated(1);
        log_write(Event::EntityUpdated, entity, id, &user_id);

        let audit = changes.map(|changes| {
            self.audit
                .record(&entity.audit_name, *id, changes, user_id, AuditAction::Update)
        });
        Ok(Mutation { node, audit })
    }

    /// Applies one patch to every document matching `filter`.
    ///
    /// `None` matches the whole collection.
    pub fn update_many(
        &self,
        entity: &EntityDescriptor,
        filter: Option<&FilterNode>,
        patch: Value,
        user_id: Uuid,
    ) -> GatewayResult<Vec<Mutation>> {
        writable(entity)?;
        self.matching_ids(entity, filter)?
            .iter()
            .map(|id| self.update_one(entity, id, patch.clone(), user_id))
            .collect()
    }

    /// Removes one document, returning it. Deletes leave the audit trail
    /// untouched.
    pub fn delete_one(&self, entity: &EntityDescriptor, id: &Uuid) -> GatewayResult<Value> {
        writable(entity)?;
        let node = self
            .store
            .delete(&entity.collection, id)?
            .ok_or_else(|| not_found(entity, id))?;
        self.metrics.add_entities_deleted(1);
        log_event_with_fields(
            Event::EntityDeleted,
            &[("entity", &entity.name), ("id", &id.to_string())],
        );
        Ok(node)
    }

    pub fn delete_many(
        &self,
        entity: &EntityDescriptor,
        filter: Option<&FilterNode>,
    ) -> GatewayResult<Vec<Value>> {
        writable(entity)?;
        self.matching_ids(entity, filter)?
            .iter()
            .map(|id| self.delete_one(entity, id))
            .collect()
    }

    /// Ids of documents matching a filter, evaluated with relations joined
    fn matching_ids(
        &self,
        entity: &EntityDescriptor,
        filter: Option<&FilterNode>,
    ) -> GatewayResult<Vec<Uuid>> {
        let predicate = FilterCompiler::compile_optional(filter)?;
        let mut pipeline = Pipeline::from(entity.relations.clone());
        if !predicate.is_empty() {
            pipeline.push(Stage::Match(predicate));
        }
        Ok(self
            .store
            .aggregate(&entity.collection, &pipeline)?
            .iter()
            .filter_map(document_id)
            .collect())
    }
}

fn writable(entity: &EntityDescriptor) -> GatewayResult<()> {
    if entity.read_only {
        return Err(GatewayError::ReadOnly(entity.name.clone()));
    }
    Ok(())
}

fn payload(value: Value) -> GatewayResult<Map<String, Value>> {
    match value {
        Value::Object(fields) => {
            if fields.contains_key(PRIMARY_KEY) || fields.contains_key("id") {
                return Err(GatewayError::invalid_payload(
                    "primary key is assigned by the gateway",
                ));
            }
            Ok(fields)
        }
        _ => Err(GatewayError::invalid_payload("expected an object")),
    }
}

fn changeset(entity: &EntityDescriptor) -> ChangeSetBuilder {
    match &entity.public_fields {
        Some(fields) => ChangeSetBuilder::new().with_public_fields(fields.iter().cloned()),
        None => ChangeSetBuilder::new(),
    }
}

fn not_found(entity: &EntityDescriptor, id: &Uuid) -> GatewayError {
    GatewayError::NotFound {
        entity: entity.name.clone(),
        id: *id,
    }
}

fn log_write(event: Event, entity: &EntityDescriptor, id: &Uuid, user_id: &Uuid) {
    log_event_with_fields(
        event,
        &[
            ("entity", &entity.name),
            ("id", &id.to_string()),
            ("user_id", &user_id.to_string()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ChangeEntry, MemoryAuditStore};
    use crate::filter::FilterOperator;
    use crate::gateway::EntityCatalog;
    use crate::store::MemoryStore;

    fn gateway() -> EntityGateway<MemoryStore> {
        let metrics = Arc::new(MetricsRegistry::new());
        let recorder = Arc::new(AuditRecorder::new(MemoryAuditStore::new(), metrics));
        EntityGateway::new(Arc::new(MemoryStore::new()), recorder)
    }

    #[test]
    fn test_create_applies_defaults_and_audits() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let contacts = catalog.get("contacts").unwrap();
        let user = Uuid::new_v4();

        let mutation = gateway
            .create_one(contacts, json!({"name": "Ann", "status": "CUSTOMER"}), user)
            .unwrap();
        assert_eq!(mutation.node["stage"], "LEAD");
        assert_eq!(mutation.node["status"], "CUSTOMER");
        assert_eq!(mutation.node["createdById"], json!(user.to_string()));

        let record = mutation.audit.unwrap().unwrap();
        assert_eq!(record.action, AuditAction::Create);
        assert_eq!(record.target_entity, "Contact");
        assert_eq!(
            record.changes,
            vec![
                ChangeEntry::created("stage", "LEAD"),
                ChangeEntry::created("name", "Ann"),
                ChangeEntry::created("status", "CUSTOMER"),
            ]
        );
    }

    #[test]
    fn test_update_strips_blank_values() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let deals = catalog.get("deals").unwrap();
        let user = Uuid::new_v4();

        let created = gateway
            .create_one(deals, json!({"title": "Renewal", "value": 100}), user)
            .unwrap();
        let id = document_id(&created.node).unwrap();

        let updated = gateway
            .update_one(deals, &id, json!({"title": "", "value": 250}), user)
            .unwrap();
        assert_eq!(updated.node["title"], "Renewal");
        assert_eq!(updated.node["value"], 250);
        assert_eq!(updated.node["updatedById"], json!(user.to_string()));

        let record = updated.audit.unwrap().unwrap();
        assert_eq!(
            record.changes,
            vec![ChangeEntry::updated("value", Some("100".into()), Some("250".into()))]
        );
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let err = gateway
            .update_one(catalog.get("deals").unwrap(), &Uuid::new_v4(), json!({"value": 1}), Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err.code(), "CRM_GATEWAY_NOT_FOUND");
    }

    #[test]
    fn test_payload_rejects_primary_key() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let err = gateway
            .create_one(catalog.get("deals").unwrap(), json!({"_id": "x"}), Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err.code(), "CRM_GATEWAY_INVALID_PAYLOAD");

        let err = gateway
            .create_one(catalog.get("deals").unwrap(), json!([1]), Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err.code(), "CRM_GATEWAY_INVALID_PAYLOAD");
    }

    #[test]
    fn test_create_many_validates_before_writing() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let deals = catalog.get("deals").unwrap();

        let err = gateway
            .create_many(deals, vec![json!({"title": "ok"}), json!({"id": "bad"})], Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err.code(), "CRM_GATEWAY_INVALID_PAYLOAD");
        assert_eq!(gateway.store().count_all("deals").unwrap(), 0);
        assert_eq!(gateway.metrics().snapshot().audit_records_written, 0);
    }

    #[test]
    fn test_find_one_joins_relations() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let user = Uuid::new_v4();

        let company = gateway
            .create_one(catalog.get("companies").unwrap(), json!({"name": "Acme"}), user)
            .unwrap();
        let company_id = document_id(&company.node).unwrap();
        let deal = gateway
            .create_one(
                catalog.get("deals").unwrap(),
                json!({"title": "Renewal", "companyId": company_id.to_string(), "value": 40}),
                user,
            )
            .unwrap();

        let found = gateway
            .find_one(catalog.get("deals").unwrap(), &document_id(&deal.node).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found["company"]["name"], "Acme");

        let company = gateway
            .find_one(catalog.get("companies").unwrap(), &company_id)
            .unwrap()
            .unwrap();
        assert_eq!(company["dealsAggregate"]["sum"]["value"], 40);
        assert!(gateway
            .find_one(catalog.get("deals").unwrap(), &Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_many_variants_use_filter() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let tasks = catalog.get("tasks").unwrap();
        let user = Uuid::new_v4();

        gateway
            .create_many(
                tasks,
                vec![
                    json!({"title": "a", "priority": 1}),
                    json!({"title": "b", "priority": 2}),
                    json!({"title": "c", "priority": 3}),
                ],
                user,
            )
            .unwrap();

        let filter = FilterNode::leaf("priority", FilterOperator::Gte, json!(2));
        let updated = gateway
            .update_many(tasks, Some(&filter), json!({"completed": true}), user)
            .unwrap();
        assert_eq!(updated.len(), 2);

        let done = FilterNode::leaf("completed", FilterOperator::Eq, json!(true));
        let removed = gateway.delete_many(tasks, Some(&done)).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(gateway.store().count_all("tasks").unwrap(), 1);

        let snapshot = gateway.metrics().snapshot();
        assert_eq!(snapshot.entities_created, 3);
        assert_eq!(snapshot.entities_updated, 2);
        assert_eq!(snapshot.entities_deleted, 2);
        assert_eq!(snapshot.audit_records_written, 5);
    }

    #[test]
    fn test_quote_update_prices_items() {
        let gateway = gateway();
        let catalog = EntityCatalog::crm();
        let quotes = catalog.get("quotes").unwrap();
        let user = Uuid::new_v4();

        let quote = gateway
            .create_one(quotes, json!({"title": "Q1"}), user)
            .unwrap();
        assert_eq!(quote.node["status"], "DRAFT");
        let id = document_id(&quote.node).unwrap();

        let updated = gateway
            .update_one(
                quotes,
                &id,
                json!({"items": [{"title": "Seat", "unitPrice": 10, "quantity": 3, "discount": 0}], "tax": 10}),
                user,
            )
            .unwrap();
        assert_eq!(updated.node["subTotal"], 30);
        assert_eq!(updated.node["total"], 33);
        assert_eq!(updated.node["items"][0]["totalPrice"], 30);
    }

    #[test]
    fn test_find_counts_metrics() {
        let gateway = gateway().with_max_limit(5);
        let catalog = EntityCatalog::crm();
        let deals = catalog.get("deals").unwrap();
        gateway
            .create_one(deals, json!({"title": "x"}), Uuid::new_v4())
            .unwrap();

        let result = gateway.find(deals, &Query::new()).unwrap();
        assert_eq!(result.total_count, 1);
        assert!(gateway.find(deals, &Query::new().with_paging(None, Some(6))).is_err());

        let snapshot = gateway.metrics().snapshot();
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.queries_rejected, 1);
        assert_eq!(snapshot.rows_returned, 1);
    }
}
