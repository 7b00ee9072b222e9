//! Offset/limit paging
//!
//! A page is produced by two engine stages: an absolute cutoff
//! `Limit(offset + limit)` followed by `Skip(offset)`. The result is the
//! `limit` documents starting at `offset`.

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use super::pipeline::Stage;

/// Default page size ceiling
pub const DEFAULT_MAX_LIMIT: u64 = 1000;

/// Wire paging request; both fields optional, negatives clamp to zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl PagingSpec {
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        Self { offset, limit }
    }
}

/// Normalized page window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSpec {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl WindowSpec {
    /// Engine stages realizing this window
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Vec::with_capacity(2);
        if let Some(limit) = self.limit {
            stages.push(Stage::Limit(self.offset.saturating_add(limit)));
        }
        if self.offset > 0 {
            stages.push(Stage::Skip(self.offset));
        }
        stages
    }

    /// Page flags for a filtered set of `total` documents
    pub fn page_info(&self, total: u64) -> PageInfo {
        PageInfo {
            has_next_page: self
                .limit
                .is_some_and(|limit| self.offset.saturating_add(limit) < total),
            has_previous_page: self.offset > 0,
        }
    }
}

/// Page flags returned with every connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Compiles paging requests
#[derive(Debug, Clone, Copy)]
pub struct PagingCompiler {
    max_limit: u64,
}

impl Default for PagingCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIMIT)
    }
}

impl PagingCompiler {
    pub fn new(max_limit: u64) -> Self {
        Self { max_limit }
    }

    pub fn max_limit(&self) -> u64 {
        self.max_limit
    }

    /// Compile a paging request into a window.
    pub fn compile(&self, paging: &PagingSpec) -> QueryResult<WindowSpec> {
        let offset = clamp(paging.offset).unwrap_or(0);
        let limit = clamp(paging.limit);

        if let Some(requested) = limit {
            if requested > self.max_limit {
                return Err(QueryError::LimitExceeded {
                    requested,
                    max: self.max_limit,
                });
            }
        }

        Ok(WindowSpec { offset, limit })
    }
}

fn clamp(value: Option<i64>) -> Option<u64> {
    value.map(|v| v.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(offset: Option<i64>, limit: Option<i64>) -> WindowSpec {
        PagingCompiler::default()
            .compile(&PagingSpec::new(offset, limit))
            .unwrap()
    }

    #[test]
    fn test_empty_paging_has_no_stages() {
        let w = window(None, None);
        assert!(w.stages().is_empty());
        assert_eq!(w.page_info(100), PageInfo::default());
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            window(Some(10), Some(10)).stages(),
            vec![Stage::Limit(20), Stage::Skip(10)]
        );
        assert_eq!(window(None, Some(5)).stages(), vec![Stage::Limit(5)]);
        assert_eq!(window(Some(3), None).stages(), vec![Stage::Skip(3)]);
    }

    #[test]
    fn test_negative_values_clamp() {
        let w = window(Some(-5), Some(-1));
        assert_eq!(w, WindowSpec { offset: 0, limit: Some(0) });
    }

    #[test]
    fn test_page_info() {
        let w = window(Some(10), Some(10));
        assert_eq!(
            w.page_info(25),
            PageInfo {
                has_next_page: true,
                has_previous_page: true
            }
        );
        assert!(!w.page_info(20).has_next_page);
        assert!(!window(Some(0), None).page_info(25).has_next_page);
    }

    #[test]
    fn test_limit_ceiling() {
        let err = PagingCompiler::new(50)
            .compile(&PagingSpec::new(None, Some(51)))
            .unwrap_err();
        assert!(matches!(err, QueryError::LimitExceeded { requested: 51, max: 50 }));
    }

    #[test]
    fn test_page_info_wire_names() {
        let info = PageInfo {
            has_next_page: true,
            has_previous_page: false,
        };
        assert_eq!(
            serde_json::to_value(info).unwrap(),
            serde_json::json!({"hasNextPage": true, "hasPreviousPage": false})
        );
    }
}
