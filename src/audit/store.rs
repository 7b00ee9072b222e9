//! Audit persistence
//!
//! [`AuditStore`] is the seam between the recorder and durable storage.
//! Stores keep records in creation order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::Pipeline;
use crate::store::{DocumentStore, PRIMARY_KEY};

use super::change::ChangeEntry;
use super::errors::{AuditError, AuditResult};
use super::record::{format_timestamp, AuditRecord};

/// Collection holding document-backed audit records
pub const AUDIT_COLLECTION: &str = "audits";

/// Audit persistence trait
///
/// Records are append-mostly: inserted once, then only extended through
/// [`append_change`](AuditStore::append_change).
pub trait AuditStore: Send + Sync {
    /// Persists a new record
    fn insert(&self, record: &AuditRecord) -> AuditResult<()>;

    /// Appends one change to an existing record and returns the result.
    ///
    /// Unknown ids are [`AuditError::NotFound`].
    fn append_change(
        &self,
        id: &Uuid,
        change: ChangeEntry,
        at: DateTime<Utc>,
    ) -> AuditResult<AuditRecord>;

    fn get(&self, id: &Uuid) -> AuditResult<Option<AuditRecord>>;

    /// Every record, in creation order
    fn records(&self) -> AuditResult<Vec<AuditRecord>>;
}

/// In-memory audit store
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    inner: Mutex<RecordIndex>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AuditResult<MutexGuard<'_, RecordIndex>> {
        self.inner.lock().map_err(|_| AuditError::Poisoned)
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |index| index.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for MemoryAuditStore {
    fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    fn append_change(
        &self,
        id: &Uuid,
        change: ChangeEntry,
        at: DateTime<Utc>,
    ) -> AuditResult<AuditRecord> {
        self.lock()?.amend(id, change, at)
    }

    fn get(&self, id: &Uuid) -> AuditResult<Option<AuditRecord>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        Ok(self.lock()?.records.clone())
    }
}

/// Ordered records with an id index, shared by the memory and file stores
#[derive(Debug, Default)]
pub(crate) struct RecordIndex {
    pub(crate) records: Vec<AuditRecord>,
    positions: HashMap<Uuid, usize>,
}

impl RecordIndex {
    pub(crate) fn push(&mut self, record: AuditRecord) {
        self.positions.insert(record.id, self.records.len());
        self.records.push(record);
    }

    pub(crate) fn get(&self, id: &Uuid) -> Option<&AuditRecord> {
        self.positions.get(id).and_then(|&i| self.records.get(i))
    }

    pub(crate) fn contains(&self, id: &Uuid) -> bool {
        self.positions.contains_key(id)
    }

    pub(crate) fn amend(
        &mut self,
        id: &Uuid,
        change: ChangeEntry,
        at: DateTime<Utc>,
    ) -> AuditResult<AuditRecord> {
        let index = *self.positions.get(id).ok_or(AuditError::NotFound(*id))?;
        let record = self
            .records
            .get_mut(index)
            .ok_or(AuditError::NotFound(*id))?;
        record.amend(change, at);
        Ok(record.clone())
    }
}

/// Audit records kept in the `audits` collection of a document store
///
/// The activity feed can then be queried with the same filter, sort and
/// paging requests as any entity.
pub struct DocumentAuditStore<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> DocumentAuditStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

/// Stores `id` as the primary key
fn to_document(record: &AuditRecord) -> AuditResult<Value> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut value {
        if let Some(id) = fields.remove("id") {
            fields.insert(PRIMARY_KEY.to_string(), id);
        }
    }
    Ok(value)
}

fn from_document(mut document: Value) -> AuditResult<AuditRecord> {
    if let Value::Object(fields) = &mut document {
        if let Some(id) = fields.remove(PRIMARY_KEY) {
            fields.insert("id".to_string(), id);
        }
    }
    Ok(serde_json::from_value(document)?)
}

impl<S: DocumentStore + ?Sized> AuditStore for DocumentAuditStore<S> {
    fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        self.store.insert(AUDIT_COLLECTION, to_document(record)?)?;
        Ok(())
    }

    fn append_change(
        &self,
        id: &Uuid,
        change: ChangeEntry,
        at: DateTime<Utc>,
    ) -> AuditResult<AuditRecord> {
        let mut record = self.get(id)?.ok_or(AuditError::NotFound(*id))?;
        record.amend(change, at);

        let mut patch = Map::new();
        patch.insert("changes".into(), serde_json::to_value(&record.changes)?);
        patch.insert("updatedAt".into(), Value::String(format_timestamp(&at)));
        self.store
            .update(AUDIT_COLLECTION, id, &patch)?
            .ok_or(AuditError::NotFound(*id))?;
        Ok(record)
    }

    fn get(&self, id: &Uuid) -> AuditResult<Option<AuditRecord>> {
        self.store
            .get(AUDIT_COLLECTION, id)?
            .map(from_document)
            .transpose()
    }

    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        self.store
            .aggregate(AUDIT_COLLECTION, &Pipeline::new())?
            .into_iter()
            .map(from_document)
            .collect()
    }
}
