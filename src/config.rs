//! Configuration
//!
//! JSON file, all fields but `data_dir` optional:
//!
//! ```json
//! {
//!   "data_dir": "./crm-data",
//!   "audit_log": "./crm-data/audit.log",
//!   "operator_policy": "strict",
//!   "max_limit": 1000,
//!   "log_level": "info"
//! }
//! ```
//!
//! Without `audit_log` the audit trail lives in the `audits` collection of
//! the document store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::OperatorPolicy;
use crate::observability::{log_event_with_fields, Event, Severity};
use crate::query::DEFAULT_MAX_LIMIT;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CRM_CONFIG_READ",
            ConfigError::Parse(_) | ConfigError::Invalid(_) => "CRM_CONFIG_INVALID",
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Directory of per-collection JSON snapshots (required)
    pub data_dir: PathBuf,

    /// Audit journal path; absent means the `audits` collection
    #[serde(default)]
    pub audit_log: Option<PathBuf>,

    /// Unknown filter operators: "strict" (default) or "lenient"
    #[serde(default)]
    pub operator_policy: OperatorPolicy,

    /// Largest accepted page size (default 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_limit() -> u64 {
    DEFAULT_MAX_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CrmConfig {
    /// Config with defaults for everything but the data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            audit_log: None,
            operator_policy: OperatorPolicy::default(),
            max_limit: DEFAULT_MAX_LIMIT,
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: CrmConfig = serde_json::from_str(&content)?;
        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("data_dir", &config.data_dir.display().to_string()),
                ("max_limit", &config.max_limit.to_string()),
                ("path", &path.display().to_string()),
            ],
        );
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid("max_limit must be > 0".into()));
        }
        if matches!(&self.audit_log, Some(path) if path.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid("audit_log must not be empty".into()));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "log_level '{}' must be one of trace, info, warn, error",
                self.log_level
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config: CrmConfig = serde_json::from_str(r#"{"data_dir": "/tmp/crm"}"#).unwrap();
        assert_eq!(config, CrmConfig::new("/tmp/crm"));
        assert_eq!(config.operator_policy, OperatorPolicy::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm.json");
        fs::write(
            &path,
            r#"{"data_dir": "data", "audit_log": "data/audit.log", "operator_policy": "lenient", "max_limit": 50, "log_level": "warn"}"#,
        )
        .unwrap();

        let config = CrmConfig::load(&path).unwrap();
        assert_eq!(config.operator_policy, OperatorPolicy::Lenient);
        assert_eq!(config.max_limit, 50);
        assert_eq!(config.audit_log, Some(PathBuf::from("data/audit.log")));
        assert_eq!(config.severity().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = CrmConfig::new("data");
        config.max_limit = 0;
        assert_eq!(config.validate().unwrap_err().code(), "CRM_CONFIG_INVALID");

        let mut config = CrmConfig::new("data");
        config.log_level = "loud".into();
        assert!(config.validate().is_err());

        let err: Result<CrmConfig, _> = serde_json::from_str(r#"{"data_dir": "d", "operator_policy": "loose"}"#);
        assert!(err.is_err());

        let missing = CrmConfig::load(Path::new("/nonexistent/crm.json")).unwrap_err();
        assert_eq!(missing.code(), "CRM_CONFIG_READ");
    }
}
