//! Query subsystem
//!
//! Compiles sort and paging requests, assembles them with the compiled
//! filter and an entity's relation stages into one engine pipeline, and
//! returns `{nodes, totalCount, pageInfo}`.
//!
//! # Execution Flow (strict order)
//!
//! 1. Relation lookups and derived fields
//! 2. Match
//! 3. Sort
//! 4. Window
//!
//! Compilers are stateless and safe to share across threads.

mod errors;
mod executor;
mod paging;
mod pipeline;
mod request;
mod sort;

pub use errors::{QueryError, QueryResult};
pub use executor::{QueryExecutor, QueryPlan};
pub use paging::{PageInfo, PagingCompiler, PagingSpec, WindowSpec, DEFAULT_MAX_LIMIT};
pub use pipeline::{Cardinality, Derive, Lookup, Pipeline, Stage};
pub use request::{Connection, Query, QueryRequest};
pub use sort::{NativeSort, SortCompiler, SortDirection, SortField, SortKey, SortSpec};
