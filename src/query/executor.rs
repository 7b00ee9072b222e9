//! Query executor
//!
//! Assembles one pipeline per request:
//!
//! 1. Relation lookups and derived fields
//! 2. Compiled match (omitted when the predicate is empty)
//! 3. Sort (omitted when no sort is requested)
//! 4. Window: `Limit(offset + limit)` then `Skip(offset)`
//!
//! The total count is a separate query over steps 1-2, or a plain collection
//! count when there is no predicate. The two reads are not isolated from
//! concurrent writes and may disagree.

use serde_json::{json, Value};

use crate::filter::FilterCompiler;
use crate::observability::{log_event_with_fields, Event};
use crate::store::DocumentStore;

use super::errors::QueryResult;
use super::paging::{PagingCompiler, WindowSpec};
use super::pipeline::{Pipeline, Stage};
use super::request::{Connection, Query};
use super::sort::SortCompiler;

/// Compiled form of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Node fetch pipeline
    pub pipeline: Pipeline,
    /// Count pipeline; `None` means a full collection count
    pub count_pipeline: Option<Pipeline>,
    pub window: WindowSpec,
}

impl QueryPlan {
    /// Explain rendering
    pub fn to_json(&self) -> Value {
        json!({
            "pipeline": self.pipeline.to_json(),
            "count": match &self.count_pipeline {
                Some(pipeline) => pipeline.to_json(),
                None => json!("collection"),
            },
            "window": {
                "offset": self.window.offset,
                "limit": self.window.limit,
            },
        })
    }
}

/// Executes queries against a document store
pub struct QueryExecutor<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    paging: PagingCompiler,
}

impl<'a, S: DocumentStore + ?Sized> QueryExecutor<'a, S> {
    pub fn new(store: &'a S, paging: PagingCompiler) -> Self {
        Self { store, paging }
    }

    /// Compiles a query and its relation stages into a plan.
    pub fn plan(&self, query: &Query, relations: &[Stage]) -> QueryResult<QueryPlan> {
        let predicate = FilterCompiler::compile_optional(query.filter.as_ref())?;
        let sort = SortCompiler::compile(&query.sort);
        let window = self.paging.compile(&query.paging)?;

        let mut prefix = Pipeline::new();
        prefix.extend(relations.iter().cloned());

        let count_pipeline = if predicate.is_empty() {
            None
        } else {
            prefix.push(Stage::Match(predicate));
            Some(prefix.clone())
        };

        let mut pipeline = prefix;
        if let Some(sort) = sort {
            pipeline.push(Stage::Sort(sort));
        }
        pipeline.extend(window.stages());

        Ok(QueryPlan {
            pipeline,
            count_pipeline,
            window,
        })
    }

    /// Runs a query against `collection`.
    pub fn execute(
        &self,
        collection: &str,
        query: &Query,
        relations: &[Stage],
    ) -> QueryResult<Connection> {
        let result = self.run(collection, query, relations);
        if let Err(e) = &result {
            log_event_with_fields(
                Event::QueryRejected,
                &[
                    ("code", e.code()),
                    ("collection", collection),
                    ("reason", &e.to_string()),
                ],
            );
        }
        result
    }

    fn run(&self, collection: &str, query: &Query, relations: &[Stage]) -> QueryResult<Connection> {
        let plan = self.plan(query, relations)?;

        let total_count = match &plan.count_pipeline {
            Some(pipeline) => self.store.count(collection, pipeline)?,
            None => self.store.count_all(collection)?,
        };
        let nodes = self.store.aggregate(collection, &plan.pipeline)?;

        log_event_with_fields(
            Event::QueryExecuted,
            &[
                ("collection", collection),
                ("rows", &nodes.len().to_string()),
                ("total", &total_count.to_string()),
            ],
        );

        Ok(Connection {
            nodes,
            total_count,
            page_info: plan.window.page_info(total_count),
        })
    }
}
