//! Audit recorder
//!
//! Persists change sets as audit records. Recording happens after the
//! entity write it describes and never undoes it: a failed record is logged
//! as `AUDIT_WRITE_FAILED`, counted, and returned to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

use super::change::ChangeEntry;
use super::errors::AuditResult;
use super::record::{now, AuditAction, AuditRecord};
use super::store::AuditStore;

/// Activity feed request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFeedQuery {
    #[serde(default)]
    pub target_entity: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Writes and reads the audit trail
pub struct AuditRecorder {
    store: Box<dyn AuditStore>,
    metrics: Arc<MetricsRegistry>,
}

impl AuditRecorder {
    pub fn new(store: impl AuditStore + 'static, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            store: Box::new(store),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Persists one audit record for a committed mutation.
    pub fn record(
        &self,
        target_entity: &str,
        target_id: Uuid,
        changes: Vec<ChangeEntry>,
        user_id: Uuid,
        action: AuditAction,
    ) -> AuditResult<AuditRecord> {
        let record = AuditRecord::new(action, target_entity, target_id, changes, user_id);
        let target = target_id.to_string();

        match self.store.insert(&record) {
            Ok(()) => {
                self.metrics.increment_audit_records();
                log_event_with_fields(
                    Event::AuditRecorded,
                    &[
                        ("action", action.as_str()),
                        ("audit_id", &record.id.to_string()),
                        ("changes", &record.changes.len().to_string()),
                        ("target_entity", target_entity),
                        ("target_id", &target),
                    ],
                );
                Ok(record)
            }
            Err(e) => {
                self.metrics.increment_audit_write_failures();
                log_event_with_fields(
                    Event::AuditWriteFailed,
                    &[
                        ("action", action.as_str()),
                        ("code", e.code()),
                        ("reason", &e.to_string()),
                        ("target_entity", target_entity),
                        ("target_id", &target),
                    ],
                );
                Err(e)
            }
        }
    }

    /// Appends one change to an existing record.
    pub fn amend(&self, audit_id: &Uuid, change: ChangeEntry) -> AuditResult<AuditRecord> {
        let record = self.store.append_change(audit_id, change, now())?;
        self.metrics.increment_audit_amendments();
        log_event_with_fields(
            Event::AuditAmended,
            &[
                ("audit_id", &audit_id.to_string()),
                ("changes", &record.changes.len().to_string()),
            ],
        );
        Ok(record)
    }

    pub fn get(&self, audit_id: &Uuid) -> AuditResult<Option<AuditRecord>> {
        self.store.get(audit_id)
    }

    /// Records for one entity instance, oldest first
    pub fn history(&self, target_entity: &str, target_id: &Uuid) -> AuditResult<Vec<AuditRecord>> {
        Ok(self
            .store
            .records()?
            .into_iter()
            .filter(|r| r.target_entity == target_entity && r.target_id == *target_id)
            .collect())
    }

    /// Activity feed, newest first
    pub fn recent(&self, query: &AuditFeedQuery) -> AuditResult<Vec<AuditRecord>> {
        let mut records: Vec<AuditRecord> = self
            .store
            .records()?
            .into_iter()
            .rev()
            .filter(|r| {
                query
                    .target_entity
                    .as_ref()
                    .map_or(true, |entity| &r.target_entity == entity)
                    && query.user_id.map_or(true, |user| r.user_id == user)
            })
            .collect();

        // Stable: equal timestamps keep newest-inserted first
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}
