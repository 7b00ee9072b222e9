//! Observable events
//!
//! Every log line the crate writes names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration and persistence
    ConfigLoaded,
    StoreLoaded,
    StoreSaved,

    // Filter compilation
    /// Unknown operator dropped under the lenient policy
    FilterOperatorIgnored,

    // Queries
    QueryExecuted,
    QueryRejected,

    // Entity writes
    EntityCreated,
    EntityUpdated,
    EntityDeleted,

    // Audit trail
    AuditRecorded,
    AuditAmended,
    /// Entity write committed but its audit record was lost
    AuditWriteFailed,
    AuditJournalReplayed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreLoaded => "STORE_LOADED",
            Event::StoreSaved => "STORE_SAVED",
            Event::FilterOperatorIgnored => "FILTER_OPERATOR_IGNORED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::EntityCreated => "ENTITY_CREATED",
            Event::EntityUpdated => "ENTITY_UPDATED",
            Event::EntityDeleted => "ENTITY_DELETED",
            Event::AuditRecorded => "AUDIT_RECORDED",
            Event::AuditAmended => "AUDIT_AMENDED",
            Event::AuditWriteFailed => "AUDIT_WRITE_FAILED",
            Event::AuditJournalReplayed => "AUDIT_JOURNAL_REPLAYED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::FilterOperatorIgnored | Event::QueryRejected => Severity::Warn,
            Event::AuditWriteFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
