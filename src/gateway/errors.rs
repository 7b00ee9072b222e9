//! Gateway errors
//!
//! Error codes:
//! - CRM_GATEWAY_NOT_FOUND
//! - CRM_GATEWAY_UNKNOWN_ENTITY
//! - CRM_GATEWAY_INVALID_PAYLOAD
//! - CRM_GATEWAY_READ_ONLY
//! - CRM_QUERY_* / CRM_FILTER_* / CRM_STORE_* (passed through)
//!
//! Audit failures are not gateway errors: they ride on the
//! [`Mutation`](super::Mutation) of the committed write.

use thiserror::Error;
use uuid::Uuid;

use crate::filter::FilterError;
use crate::query::QueryError;
use crate::store::StoreError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No document with this id in the entity's collection
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: Uuid },

    /// Entity name absent from the catalog
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// Mutation payload rejected before any write
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Write attempted on a read-only entity
    #[error("entity '{0}' is read-only")]
    ReadOnly(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GatewayError {
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        GatewayError::InvalidPayload(reason.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "CRM_GATEWAY_NOT_FOUND",
            GatewayError::UnknownEntity(_) => "CRM_GATEWAY_UNKNOWN_ENTITY",
            GatewayError::InvalidPayload(_) => "CRM_GATEWAY_INVALID_PAYLOAD",
            GatewayError::ReadOnly(_) => "CRM_GATEWAY_READ_ONLY",
            GatewayError::Query(e) => e.code(),
            GatewayError::Filter(e) => e.code(),
            GatewayError::Store(e) => e.code(),
        }
    }
}
