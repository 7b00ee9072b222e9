//! Query requests and results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{FilterNode, FilterParser, FilterResult};

use super::paging::{PageInfo, PagingSpec};
use super::sort::SortSpec;

/// Wire query request: `{filter?, sorting?, paging?}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub sorting: SortSpec,
    #[serde(default)]
    pub paging: PagingSpec,
}

impl QueryRequest {
    /// Parses the wire filter into a typed query.
    pub fn into_query(self, parser: &FilterParser) -> FilterResult<Query> {
        let filter = match &self.filter {
            Some(value) => parser.parse(value)?,
            None => None,
        };
        Ok(Query {
            filter,
            sort: self.sorting,
            paging: self.paging,
        })
    }
}

/// Typed query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<FilterNode>,
    pub sort: SortSpec,
    pub paging: PagingSpec,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_paging(mut self, offset: Option<i64>, limit: Option<i64>) -> Self {
        self.paging = PagingSpec::new(offset, limit);
        self
    }
}

/// Paged result: `{nodes, totalCount, pageInfo}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub nodes: Vec<Value>,
    pub total_count: u64,
    pub page_info: PageInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOperator, OperatorPolicy};
    use serde_json::json;

    #[test]
    fn test_request_from_wire() {
        let request: QueryRequest = serde_json::from_value(json!({
            "filter": {"name": {"iLike": "%acme%"}},
            "sorting": [{"field": "name", "direction": "DESC"}],
            "paging": {"offset": 10, "limit": 20}
        }))
        .unwrap();

        let query = request
            .into_query(&FilterParser::new(OperatorPolicy::Strict))
            .unwrap();
        assert_eq!(
            query.filter,
            Some(FilterNode::leaf("name", FilterOperator::ILike, json!("%acme%")))
        );
        assert_eq!(query.sort, SortSpec::new().desc("name"));
        assert_eq!(query.paging, PagingSpec::new(Some(10), Some(20)));
    }

    #[test]
    fn test_empty_request() {
        let request: QueryRequest = serde_json::from_value(json!({})).unwrap();
        let query = request.into_query(&FilterParser::default()).unwrap();
        assert_eq!(query, Query::new());
    }

    #[test]
    fn test_connection_wire_names() {
        let connection = Connection {
            nodes: vec![],
            total_count: 0,
            page_info: PageInfo::default(),
        };
        assert_eq!(
            serde_json::to_value(connection).unwrap(),
            json!({
                "nodes": [],
                "totalCount": 0,
                "pageInfo": {"hasNextPage": false, "hasPreviousPage": false}
            })
        );
    }
}
