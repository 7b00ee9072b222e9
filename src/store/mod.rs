//! Document store subsystem
//!
//! The query engine behind every entity. Documents are JSON objects keyed by
//! a UUID in `_id`; reads run a [`Pipeline`] of typed stages.
//!
//! # Guarantees
//!
//! - Collection scan order is insertion order
//! - Sorting is stable
//! - Lookups never fail on dangling references; they join nothing

pub mod document;
mod errors;
mod memory;

pub use document::PRIMARY_KEY;
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::Pipeline;

/// Engine seam used by the query executor, the entity gateway and the
/// document-backed audit store
pub trait DocumentStore: Send + Sync {
    /// Runs a pipeline over a collection
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Value>>;

    /// Counts the documents a pipeline yields
    fn count(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<u64> {
        Ok(self.aggregate(collection, pipeline)?.len() as u64)
    }

    /// Counts every document in a collection
    fn count_all(&self, collection: &str) -> StoreResult<u64>;

    /// Inserts a document, which must carry a UUID `_id`
    fn insert(&self, collection: &str, document: Value) -> StoreResult<Value>;

    /// Fetches a document by primary key, without lookups
    fn get(&self, collection: &str, id: &Uuid) -> StoreResult<Option<Value>>;

    /// Merges top-level `patch` fields into a document.
    ///
    /// Returns the updated document, or `None` when the id is unknown.
    fn update(
        &self,
        collection: &str,
        id: &Uuid,
        patch: &Map<String, Value>,
    ) -> StoreResult<Option<Value>>;

    /// Removes a document, returning it
    fn delete(&self, collection: &str, id: &Uuid) -> StoreResult<Option<Value>>;
}

/// Reads the primary key of a document
pub fn document_id(document: &Value) -> Option<Uuid> {
    document
        .get(PRIMARY_KEY)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}
