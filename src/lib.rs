//! crmcore - query compilation and change auditing for CRM entities
//!
//! - [`filter`]: wire filter trees compiled to engine predicates
//! - [`query`]: sort and paging compilers, pipeline executor
//! - [`store`]: in-process document engine
//! - [`audit`]: field-level change sets and the audit trail
//! - [`gateway`]: descriptor-driven CRUD for the CRM entity catalog

pub mod audit;
pub mod cli;
pub mod config;
pub mod filter;
pub mod gateway;
pub mod observability;
pub mod query;
pub mod store;
