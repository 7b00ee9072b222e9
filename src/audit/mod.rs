//! Audit trail subsystem
//!
//! Every entity mutation is mirrored into an [`AuditRecord`] holding its
//! field-level [`ChangeEntry`] list.
//!
//! # Lifecycle
//!
//! 1. Created once per mutation, after the entity write
//! 2. Optionally extended through amendment
//! 3. Never deleted with the entity it describes
//!
//! # Stores
//!
//! - [`MemoryAuditStore`]: process-local
//! - [`FileAuditStore`]: checksummed append-only journal, fsync per write
//! - [`DocumentAuditStore`]: the `audits` collection of a document store

mod change;
mod errors;
mod file;
mod record;
mod recorder;
mod store;

pub use change::{render, ChangeEntry, ChangeSetBuilder};
pub use errors::{AuditError, AuditResult};
pub use file::FileAuditStore;
pub use record::{format_timestamp, now, AuditAction, AuditRecord};
pub use recorder::{AuditFeedQuery, AuditRecorder};
pub use store::{AuditStore, DocumentAuditStore, MemoryAuditStore, AUDIT_COLLECTION};
