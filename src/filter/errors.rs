//! # Filter Errors
//!
//! Error types for parsing and compiling filter trees.

use thiserror::Error;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Filter shape does not match the wire format
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Operator outside the supported table
    #[error("Unsupported operator '{operator}' on field '{field}'")]
    InvalidOperator { field: String, operator: String },

    /// Operand cannot be used with the operator or coerced for the field
    #[error("Invalid value for {operator} on '{field}': {reason}")]
    InvalidValue {
        field: String,
        operator: String,
        reason: String,
    },
}

impl FilterError {
    pub fn invalid_filter(reason: impl Into<String>) -> Self {
        FilterError::InvalidFilter(reason.into())
    }

    pub fn invalid_value(
        field: impl Into<String>,
        operator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FilterError::InvalidValue {
            field: field.into(),
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::InvalidFilter(_) => "CRM_FILTER_INVALID",
            FilterError::InvalidOperator { .. } => "CRM_FILTER_INVALID_OPERATOR",
            FilterError::InvalidValue { .. } => "CRM_FILTER_INVALID_VALUE",
        }
    }
}
