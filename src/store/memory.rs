//! In-memory document store
//!
//! Collections live behind one `RwLock`. Reads clone the documents they
//! touch, so a pipeline never holds references into the store.
//!
//! A store can be loaded from and saved to a directory holding one
//! `<collection>.json` file per collection, each a JSON array of documents.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event};
use crate::query::{Cardinality, Derive, Lookup, Pipeline, Stage};

use super::document::{compare_values, key_values, resolve_path, set_path, PRIMARY_KEY};
use super::errors::{StoreError, StoreResult};
use super::{document_id, DocumentStore};

const SNAPSHOT_EXTENSION: &str = "json";

#[derive(Debug, Default, Clone)]
struct Collection {
    documents: Vec<Value>,
    positions: HashMap<Uuid, usize>,
}

impl Collection {
    fn insert(&mut self, name: &str, document: Value) -> StoreResult<Value> {
        if !document.is_object() {
            return Err(StoreError::InvalidDocument(format!(
                "documents in '{}' must be JSON objects",
                name
            )));
        }
        let id = document_id(&document)
            .ok_or_else(|| StoreError::MissingPrimaryKey(name.to_string()))?;
        if self.positions.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                collection: name.to_string(),
                id: id.to_string(),
            });
        }

        self.positions.insert(id, self.documents.len());
        self.documents.push(document.clone());
        Ok(document)
    }

    fn get(&self, id: &Uuid) -> Option<&Value> {
        self.positions.get(id).and_then(|&i| self.documents.get(i))
    }

    fn get_mut(&mut self, id: &Uuid) -> Option<&mut Value> {
        let index = *self.positions.get(id)?;
        self.documents.get_mut(index)
    }

    fn remove(&mut self, id: &Uuid) -> Option<Value> {
        let index = self.positions.remove(id)?;
        let removed = self.documents.remove(index);
        for position in self.positions.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(removed)
    }
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `<collection>.json` file in `dir`.
    ///
    /// A missing directory yields an empty store.
    pub fn load_dir(dir: &Path) -> StoreResult<Self> {
        let store = Self::new();
        if !dir.exists() {
            return Ok(store);
        }

        let io_err = |source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(io_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut total = 0usize;
        {
            let mut collections = store.write()?;
            for path in &paths {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let documents: Vec<Value> =
                    serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                        path: path.display().to_string(),
                        source,
                    })?;

                let collection = collections.entry(name.to_string()).or_default();
                for document in documents {
                    collection.insert(name, document)?;
                    total += 1;
                }
            }
        }

        log_event_with_fields(
            Event::StoreLoaded,
            &[
                ("collections", &paths.len().to_string()),
                ("data_dir", &dir.display().to_string()),
                ("documents", &total.to_string()),
            ],
        );
        Ok(store)
    }

    /// Writes every collection to `dir`, one file each.
    ///
    /// Each file is written to a temporary sibling, fsynced, then renamed
    /// over the previous version.
    pub fn save_dir(&self, dir: &Path) -> StoreResult<()> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let collections = self.read()?;
        let mut names: Vec<&String> = collections.keys().collect();
        names.sort();

        for name in &names {
            let Some(collection) = collections.get(*name) else {
                continue;
            };
            let target = dir.join(format!("{}.{}", name, SNAPSHOT_EXTENSION));
            let temp = dir.join(format!("{}.{}.tmp", name, SNAPSHOT_EXTENSION));
            let io_err = |source| StoreError::Io {
                path: target.display().to_string(),
                source,
            };

            let body = serde_json::to_vec_pretty(&collection.documents).map_err(|source| {
                StoreError::Malformed {
                    path: target.display().to_string(),
                    source,
                }
            })?;

            let mut file = File::create(&temp).map_err(io_err)?;
            file.write_all(&body).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
            fs::rename(&temp, &target).map_err(io_err)?;
        }

        log_event_with_fields(
            Event::StoreSaved,
            &[
                ("collections", &names.len().to_string()),
                ("data_dir", &dir.display().to_string()),
            ],
        );
        Ok(())
    }

    /// Names of every collection holding at least one document
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let collections = self.read()?;
        let mut names: Vec<String> = collections
            .iter()
            .filter(|(_, c)| !c.documents.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections.write().map_err(|_| StoreError::Poisoned)
    }
}

impl DocumentStore for MemoryStore {
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Value>> {
        let collections = self.read()?;
        let mut documents = collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default();

        for stage in pipeline.stages() {
            match stage {
                Stage::Lookup(lookup) => {
                    let foreign = collections
                        .get(&lookup.from)
                        .map(|c| c.documents.as_slice())
                        .unwrap_or_default();
                    for document in documents.iter_mut() {
                        apply_lookup(document, lookup, foreign);
                    }
                }
                Stage::Derive(derive) => {
                    for document in documents.iter_mut() {
                        apply_derive(document, derive);
                    }
                }
                Stage::Match(predicate) => documents.retain(|d| predicate.matches(d)),
                Stage::Sort(sort) => documents.sort_by(|a, b| sort.compare(a, b)),
                Stage::Limit(n) => documents.truncate(usize::try_from(*n).unwrap_or(usize::MAX)),
                Stage::Skip(n) => {
                    let n = usize::try_from(*n).unwrap_or(usize::MAX).min(documents.len());
                    documents.drain(..n);
                }
            }
        }

        Ok(documents)
    }

    fn count_all(&self, collection: &str) -> StoreResult<u64> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map_or(0, |c| c.documents.len() as u64))
    }

    fn insert(&self, collection: &str, document: Value) -> StoreResult<Value> {
        let mut collections = self.write()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(collection, document)
    }

    fn get(&self, collection: &str, id: &Uuid) -> StoreResult<Option<Value>> {
        let collections = self.read()?;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    fn update(
        &self,
        collection: &str,
        id: &Uuid,
        patch: &Map<String, Value>,
    ) -> StoreResult<Option<Value>> {
        let mut collections = self.write()?;
        let Some(document) = collections.get_mut(collection).and_then(|c| c.get_mut(id)) else {
            return Ok(None);
        };
        let Value::Object(fields) = document else {
            return Err(StoreError::InvalidDocument(format!(
                "document {} in '{}' is not an object",
                id, collection
            )));
        };

        for (key, value) in patch {
            if key == PRIMARY_KEY {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
        Ok(Some(document.clone()))
    }

    fn delete(&self, collection: &str, id: &Uuid) -> StoreResult<Option<Value>> {
        let mut collections = self.write()?;
        Ok(collections.get_mut(collection).and_then(|c| c.remove(id)))
    }
}

/// Joins foreign documents whose `foreign_field` shares a value with the
/// local field. Array-valued keys match on any element.
fn apply_lookup(document: &mut Value, lookup: &Lookup, foreign: &[Value]) {
    let keys = key_values(document, &lookup.local_field);
    let mut joined = foreign.iter().filter(|candidate| {
        key_values(candidate, &lookup.foreign_field)
            .iter()
            .any(|fk| keys.iter().any(|k| compare_values(k, fk) == Ordering::Equal))
    });

    let value = match lookup.cardinality {
        Cardinality::One => joined.next().cloned().unwrap_or(Value::Null),
        Cardinality::Many => Value::Array(joined.cloned().collect()),
    };
    set_path(document, &lookup.as_field, value);
}

fn apply_derive(document: &mut Value, derive: &Derive) {
    match derive {
        Derive::Size { source, target } => {
            let size = match resolve_path(document, source).as_deref() {
                Some(Value::Array(items)) => items.len(),
                _ => 0,
            };
            set_path(document, target, Value::from(size as u64));
        }
        Derive::Sum {
            source,
            field,
            target,
        } => {
            let total = match resolve_path(document, source).as_deref() {
                Some(Value::Array(items)) => sum_field(items, field),
                _ => Value::from(0),
            };
            set_path(document, target, total);
        }
    }
}

/// Sums a numeric field across documents, staying integral while every
/// addend is an integer. Non-numeric values are skipped.
fn sum_field(items: &[Value], field: &str) -> Value {
    let mut integral: Option<i64> = Some(0);
    let mut float = 0.0f64;

    for item in items {
        let Some(Value::Number(n)) = resolve_path(item, field).as_deref().cloned() else {
            continue;
        };
        float += n.as_f64().unwrap_or(0.0);
        integral = match (integral, n.as_i64()) {
            (Some(acc), Some(v)) => acc.checked_add(v),
            _ => None,
        };
    }

    match integral {
        Some(sum) => Value::from(sum),
        None => Number::from_f64(float).map_or(Value::Null, Value::Number),
    }
}
