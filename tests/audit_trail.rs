//! Audit Trail Tests
//!
//! Tests for change sets and audit persistence:
//! - Create and update diffs, including list fields
//! - Records survive journal reopen, amendments included
//! - Document-backed records are queryable like any entity

use std::sync::Arc;

use crmcore::audit::{
    AuditAction, AuditFeedQuery, AuditRecorder, AuditStore, ChangeEntry, ChangeSetBuilder,
    DocumentAuditStore, FileAuditStore, AUDIT_COLLECTION,
};
use crmcore::filter::{FilterNode, FilterOperator};
use crmcore::observability::MetricsRegistry;
use crmcore::query::{PagingCompiler, Query, QueryExecutor, SortSpec};
use crmcore::store::MemoryStore;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

// =============================================================================
// Change Set Tests
// =============================================================================

/// Update diff carries both sides.
#[test]
fn test_update_diff_records_from_and_to() {
    let changes = ChangeSetBuilder::new()
        .diff_for_update(Some(&json!({"status": "OPEN"})), &fields(json!({"status": "WON"})));
    assert_eq!(
        changes,
        vec![ChangeEntry::updated("status", Some("OPEN".into()), Some("WON".into()))]
    );
}

/// Create diff has no `from` key on the wire.
#[test]
fn test_create_diff_omits_from() {
    let changes = ChangeSetBuilder::new().diff_for_create(&fields(json!({"title": "Demo"})));
    assert_eq!(
        serde_json::to_value(&changes).unwrap(),
        json!([{"field": "title", "to": "Demo"}])
    );
}

#[test]
fn test_update_diff_value_rendering() {
    let old = json!({"value": 10, "userIds": ["a"], "address": {"city": "Oslo"}});
    let changes = ChangeSetBuilder::new().diff_for_update(
        Some(&old),
        &fields(json!({
            "value": 12.5,
            "userIds": ["a", "b"],
            "address": {"city": "Bergen"},
            "notes": null,
            "completed": true
        })),
    );

    assert_eq!(
        changes,
        vec![
            ChangeEntry::updated("value", Some("10".into()), Some("12.5".into())),
            ChangeEntry::updated("userIds", Some("a".into()), Some("a,b".into())),
            ChangeEntry::updated(
                "address",
                Some(r#"{"city":"Oslo"}"#.into()),
                Some(r#"{"city":"Bergen"}"#.into())
            ),
            ChangeEntry::updated("notes", None, None),
            ChangeEntry::updated("completed", None, Some("true".into())),
        ]
    );
}

/// Object lists diff per index and sub-field.
#[test]
fn test_checklist_diff_per_index() {
    let old = json!({"checklist": [{"title": "Call", "checked": false}]});
    let changes = ChangeSetBuilder::new().diff_for_update(
        Some(&old),
        &fields(json!({"checklist": [
            {"title": "Call", "checked": true},
            {"title": "Email", "checked": false}
        ]})),
    );

    assert_eq!(
        changes,
        vec![
            ChangeEntry::updated("checklist.0.title", Some("Call".into()), Some("Call".into())),
            ChangeEntry::updated("checklist.0.checked", Some("false".into()), Some("true".into())),
            ChangeEntry::updated("checklist.1.title", Some(String::new()), Some("Email".into())),
            ChangeEntry::updated("checklist.1.checked", Some(String::new()), Some("false".into())),
        ]
    );
}

#[test]
fn test_update_without_snapshot_is_create() {
    let values = fields(json!({"title": "Demo"}));
    let builder = ChangeSetBuilder::new();
    assert_eq!(builder.diff_for_update(None, &values), builder.diff_for_create(&values));
}

#[test]
fn test_private_fields_never_recorded() {
    let changes = ChangeSetBuilder::new()
        .with_public_fields(["name", "email"])
        .diff_for_create(&fields(json!({"name": "Ann", "password": "hunter2", "email": "a@x.io"})));
    let recorded: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(recorded, vec!["name", "email"]);
}

#[test]
fn test_implied_defaults_precede_payload() {
    let defaults = fields(json!({"stage": "LEAD", "status": "NEW"}));
    let changes = ChangeSetBuilder::new()
        .diff_for_create_with_defaults(&defaults, &fields(json!({"name": "Bo", "status": "CUSTOMER"})));
    assert_eq!(
        changes,
        vec![
            ChangeEntry::created("stage", "LEAD"),
            ChangeEntry::created("name", "Bo"),
            ChangeEntry::created("status", "CUSTOMER"),
        ]
    );
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_journal_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audit.log");
    let deal = Uuid::new_v4();
    let user = Uuid::new_v4();

    let (created, amended) = {
        let recorder = AuditRecorder::new(
            FileAuditStore::open(&path).unwrap(),
            Arc::new(MetricsRegistry::new()),
        );
        let created = recorder
            .record("Deal", deal, vec![ChangeEntry::created("title", "Renewal")], user, AuditAction::Create)
            .unwrap();
        recorder
            .record(
                "Deal",
                deal,
                vec![ChangeEntry::updated("title", Some("Renewal".into()), Some("Upsell".into()))],
                user,
                AuditAction::Update,
            )
            .unwrap();
        let amended = recorder
            .amend(&created.id, ChangeEntry::created("value", "100"))
            .unwrap();
        (created, amended)
    };

    let reopened = AuditRecorder::new(
        FileAuditStore::open(&path).unwrap(),
        Arc::new(MetricsRegistry::new()),
    );
    let history = reopened.history("Deal", &deal).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], amended);
    assert_eq!(history[0].created_at, created.created_at);
    assert_eq!(history[0].changes.len(), 2);
    assert_eq!(history[1].action, AuditAction::Update);

    let feed = reopened
        .recent(&AuditFeedQuery {
            user_id: Some(user),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(feed.len(), 2);
}

/// Records in the `audits` collection answer ordinary queries.
#[test]
fn test_document_records_are_queryable() {
    let store = Arc::new(MemoryStore::new());
    let audits = DocumentAuditStore::new(Arc::clone(&store));
    let recorder = AuditRecorder::new(DocumentAuditStore::new(Arc::clone(&store)), Arc::new(MetricsRegistry::new()));
    let user = Uuid::new_v4();

    let mut ids = Vec::new();
    for entity in ["Deal", "Task", "Deal"] {
        let record = recorder
            .record(entity, Uuid::new_v4(), vec![], user, AuditAction::Create)
            .unwrap();
        ids.push(record.id);
    }
    assert_eq!(audits.records().unwrap().len(), 3);

    let executor = QueryExecutor::new(store.as_ref(), PagingCompiler::default());
    let query = Query::new()
        .with_filter(FilterNode::leaf("targetEntity", FilterOperator::Eq, json!("Deal")))
        .with_sort(SortSpec::new().asc("createdAt"));
    let result = executor.execute(AUDIT_COLLECTION, &query, &[]).unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(result.nodes[0]["_id"], json!(ids[0].to_string()));
    assert_eq!(result.nodes[1]["_id"], json!(ids[2].to_string()));

    let by_id = Query::new().with_filter(FilterNode::leaf("id", FilterOperator::Eq, json!(ids[1].to_string())));
    let result = executor.execute(AUDIT_COLLECTION, &by_id, &[]).unwrap();
    assert_eq!(result.nodes[0]["targetEntity"], "Task");
}
