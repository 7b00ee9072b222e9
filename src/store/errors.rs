//! Document store errors
//!
//! Error codes:
//! - CRM_STORE_MISSING_KEY
//! - CRM_STORE_DUPLICATE_KEY
//! - CRM_STORE_INVALID_DOCUMENT
//! - CRM_STORE_IO
//! - CRM_STORE_POISONED

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document has no usable primary key
    #[error("document in '{0}' has no valid _id")]
    MissingPrimaryKey(String),

    /// Primary key already present in the collection
    #[error("duplicate _id {id} in '{collection}'")]
    DuplicateKey { collection: String, id: String },

    /// Document is not a JSON object
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Snapshot file could not be read or written
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON
    #[error("store snapshot {path} is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A writer panicked while holding the store lock
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::MissingPrimaryKey(_) => "CRM_STORE_MISSING_KEY",
            StoreError::DuplicateKey { .. } => "CRM_STORE_DUPLICATE_KEY",
            StoreError::InvalidDocument(_) => "CRM_STORE_INVALID_DOCUMENT",
            StoreError::Io { .. } | StoreError::Malformed { .. } => "CRM_STORE_IO",
            StoreError::Poisoned => "CRM_STORE_POISONED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            StoreError::MissingPrimaryKey("deals".into()).code(),
            "CRM_STORE_MISSING_KEY"
        );
        assert_eq!(StoreError::Poisoned.code(), "CRM_STORE_POISONED");
    }

    #[test]
    fn test_duplicate_display() {
        let err = StoreError::DuplicateKey {
            collection: "deals".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "duplicate _id abc in 'deals'");
    }
}
