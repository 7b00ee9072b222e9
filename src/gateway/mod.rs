//! Entity gateway subsystem
//!
//! Replaces per-entity CRUD modules with one [`EntityGateway`] driven by
//! [`EntityDescriptor`]s. [`EntityCatalog::crm`] holds the CRM entity set.
//!
//! Reads: filter, sort and paging through the query executor, with the
//! entity's relation stages joined first.
//!
//! Writes: document store first, audit trail second, never rolled back.

mod catalog;
mod descriptor;
mod errors;
#[allow(clippy::module_inception)]
mod gateway;
mod pricing;

pub use catalog::EntityCatalog;
pub use descriptor::EntityDescriptor;
pub use errors::{GatewayError, GatewayResult};
pub use gateway::{EntityGateway, Mutation};
pub use pricing::apply_quote_pricing;
