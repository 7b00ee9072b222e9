//! Query errors
//!
//! Error codes:
//! - CRM_QUERY_LIMIT_EXCEEDED
//! - CRM_FILTER_* (from the filter compiler)
//! - CRM_STORE_* (from the engine)

use thiserror::Error;

use crate::filter::FilterError;
use crate::store::StoreError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Requested page size above the configured maximum
    #[error("limit {requested} exceeds maximum of {max}")]
    LimitExceeded { requested: u64, max: u64 },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::LimitExceeded { .. } => "CRM_QUERY_LIMIT_EXCEEDED",
            QueryError::Filter(e) => e.code(),
            QueryError::Store(e) => e.code(),
        }
    }
}
