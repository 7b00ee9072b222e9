//! Audit errors
//!
//! Error codes:
//! - CRM_AUDIT_NOT_FOUND
//! - CRM_AUDIT_IO
//! - CRM_AUDIT_CORRUPTION
//! - CRM_AUDIT_POISONED
//! - CRM_STORE_* (document-backed store)

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Audit errors
#[derive(Debug, Error)]
pub enum AuditError {
    /// No audit record with this id
    #[error("audit record {0} not found")]
    NotFound(Uuid),

    /// Journal could not be opened, read or written
    #[error("audit journal I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Journal line failed its checksum or did not parse
    #[error("audit journal corrupted at line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    /// Record could not be encoded or decoded
    #[error("audit record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A writer panicked while holding the audit lock
    #[error("audit store lock poisoned")]
    Poisoned,
}

impl AuditError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::NotFound(_) => "CRM_AUDIT_NOT_FOUND",
            AuditError::Io { .. } => "CRM_AUDIT_IO",
            AuditError::Corruption { .. } | AuditError::Serialization(_) => "CRM_AUDIT_CORRUPTION",
            AuditError::Store(e) => e.code(),
            AuditError::Poisoned => "CRM_AUDIT_POISONED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(AuditError::NotFound(Uuid::nil()).code(), "CRM_AUDIT_NOT_FOUND");
        assert_eq!(
            AuditError::Corruption {
                line: 3,
                reason: "checksum mismatch".into()
            }
            .to_string(),
            "audit journal corrupted at line 3: checksum mismatch"
        );
        assert_eq!(AuditError::Store(StoreError::Poisoned).code(), "CRM_STORE_POISONED");
    }
}
