//! # Retrieval Request Model
//!
//! Wire types for `POST /copilot/retrieval` and the pure rules used to
//! assemble a request from tool arguments.
//!
//! Hits are never interpreted locally. They stay `serde_json::Value` so the
//! response is passed through exactly as the service returned it.

use crate::scope::{Scope, ScopeSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// LIMITS
// =============================================================================

/// Documented upper bound for `queryString`. The service enforces it.
pub const MAX_QUERY_LENGTH: usize = 1500;

/// Smallest accepted `maximumNumberOfResults`.
pub const MIN_RESULTS: u32 = 1;

/// Largest accepted `maximumNumberOfResults`, also the default.
pub const MAX_RESULTS: u32 = 25;

/// Returned instead of serialized hits when the response has none.
pub const NO_HITS_MESSAGE: &str = "No retrieval hits found in the response";

// =============================================================================
// DATA SOURCE
// =============================================================================

/// Content store the retrieval runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSource {
    SharePoint,
    OneDriveBusiness,
    ExternalItem,
}

/// Pick a data source when the caller did not name one.
///
/// A session holding only `ExternalItem.Read.All` cannot search SharePoint or
/// OneDrive, so the request is pinned to `externalItem`. Any other scope
/// combination leaves the choice to the service.
#[must_use]
pub fn infer_data_source(scopes: &ScopeSet) -> Option<DataSource> {
    if scopes.contains(Scope::ExternalItemReadAll)
        && !scopes.contains(Scope::SitesReadAll)
        && !scopes.contains(Scope::FilesReadAll)
    {
        Some(DataSource::ExternalItem)
    } else {
        None
    }
}

// =============================================================================
// REQUEST
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionItem {
    pub connection_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalItemConfiguration {
    pub connections: Vec<ConnectionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_item: Option<ExternalItemConfiguration>,
}

/// Body of a retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    pub query_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_configuration: Option<DataSourceConfiguration>,
    pub maximum_number_of_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("maximumNumberOfResults must be between {MIN_RESULTS} and {MAX_RESULTS}, got {0}")]
    MaxResultsOutOfRange(i64),
}

impl RetrievalRequest {
    /// Assemble a request from tool arguments.
    ///
    /// An explicit `data_source` always wins over inference. Connection ids
    /// only produce a configuration block when the list is non-empty.
    pub fn build(
        query: impl Into<String>,
        data_source: Option<DataSource>,
        connection_ids: Option<Vec<String>>,
        maximum_number_of_results: Option<i64>,
        scopes: &ScopeSet,
    ) -> Result<Self, RetrievalError> {
        let max = maximum_number_of_results.unwrap_or(MAX_RESULTS as i64);
        if max < MIN_RESULTS as i64 || max > MAX_RESULTS as i64 {
            return Err(RetrievalError::MaxResultsOutOfRange(max));
        }

        let data_source_configuration = connection_ids
            .filter(|ids| !ids.is_empty())
            .map(|ids| DataSourceConfiguration {
                external_item: Some(ExternalItemConfiguration {
                    connections: ids
                        .into_iter()
                        .map(|connection_id| ConnectionItem { connection_id })
                        .collect(),
                }),
            });

        Ok(Self {
            query_string: query.into(),
            data_source: data_source.or_else(|| infer_data_source(scopes)),
            data_source_configuration,
            maximum_number_of_results: max as u32,
        })
    }

    /// Whether the query exceeds the length the service accepts.
    #[must_use]
    pub fn query_exceeds_limit(&self) -> bool {
        self.query_string.chars().count() > MAX_QUERY_LENGTH
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Retrieval response. Only the hit list is modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    #[serde(default)]
    pub retrieval_hits: Option<Vec<Value>>,
}

impl RetrievalResponse {
    /// Render the tool result: serialized hits, or [`NO_HITS_MESSAGE`].
    pub fn render(&self) -> Result<String, serde_json::Error> {
        match &self.retrieval_hits {
            Some(hits) => serde_json::to_string(hits),
            None => Ok(NO_HITS_MESSAGE.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scopes(values: &[&str]) -> ScopeSet {
        ScopeSet::parse(values).expect("valid scopes")
    }

    #[test]
    fn test_external_item_only_infers_external_item() {
        let request = RetrievalRequest::build(
            "find onboarding docs",
            None,
            None,
            Some(10),
            &scopes(&["ExternalItem.Read.All"]),
        )
        .expect("valid request");

        assert_eq!(request.data_source, Some(DataSource::ExternalItem));
        assert_eq!(request.maximum_number_of_results, 10);
        assert_eq!(request.query_string, "find onboarding docs");
    }

    #[test]
    fn test_files_and_sites_leave_source_unset() {
        let request = RetrievalRequest::build(
            "q",
            None,
            None,
            None,
            &scopes(&["ExternalItem.Read.All", "Files.Read.All", "Sites.Read.All"]),
        )
        .expect("valid request");

        assert_eq!(request.data_source, None);
        assert_eq!(request.maximum_number_of_results, MAX_RESULTS);
    }

    #[test]
    fn test_explicit_source_wins() {
        let request = RetrievalRequest::build(
            "q",
            Some(DataSource::SharePoint),
            None,
            None,
            &scopes(&["ExternalItem.Read.All"]),
        )
        .expect("valid request");

        assert_eq!(request.data_source, Some(DataSource::SharePoint));
    }

    #[test]
    fn test_connection_ids_attach_configuration() {
        let request = RetrievalRequest::build(
            "q",
            None,
            Some(vec!["jira".to_string(), "confluence".to_string()]),
            None,
            &scopes(&["ExternalItem.Read.All"]),
        )
        .expect("valid request");

        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            json!({
                "queryString": "q",
                "dataSource": "externalItem",
                "dataSourceConfiguration": {
                    "externalItem": {
                        "connections": [
                            { "connectionId": "jira" },
                            { "connectionId": "confluence" }
                        ]
                    }
                },
                "maximumNumberOfResults": 25
            })
        );
    }

    #[test]
    fn test_empty_connection_ids_attach_nothing() {
        let request = RetrievalRequest::build(
            "q",
            None,
            Some(Vec::new()),
            None,
            &scopes(&["Files.Read.All", "Sites.Read.All"]),
        )
        .expect("valid request");

        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            json!({ "queryString": "q", "maximumNumberOfResults": 25 })
        );
    }

    #[test]
    fn test_result_count_bounds() {
        let set = scopes(&["ExternalItem.Read.All"]);
        for bad in [0, 26, -3] {
            assert_eq!(
                RetrievalRequest::build("q", None, None, Some(bad), &set),
                Err(RetrievalError::MaxResultsOutOfRange(bad))
            );
        }
        for good in [1, 25] {
            assert!(RetrievalRequest::build("q", None, None, Some(good), &set).is_ok());
        }
    }

    #[test]
    fn test_query_length_check_counts_chars() {
        let set = scopes(&["ExternalItem.Read.All"]);
        let at_limit = "é".repeat(MAX_QUERY_LENGTH);
        let request = RetrievalRequest::build(at_limit, None, None, None, &set).expect("valid");
        assert!(!request.query_exceeds_limit());

        let over = "a".repeat(MAX_QUERY_LENGTH + 1);
        let request = RetrievalRequest::build(over, None, None, None, &set).expect("valid");
        assert!(request.query_exceeds_limit());
    }

    #[test]
    fn test_response_without_hits_renders_sentinel() {
        let response: RetrievalResponse = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(response.render().expect("render"), NO_HITS_MESSAGE);

        let response: RetrievalResponse =
            serde_json::from_value(json!({ "retrievalHits": null })).expect("parse");
        assert_eq!(
            response.render().expect("render"),
            "No retrieval hits found in the response"
        );
    }

    #[test]
    fn test_hits_pass_through_unmodified() {
        let hits = json!([
            {
                "webUrl": "https://contoso.sharepoint.com/doc.docx",
                "extracts": [{ "text": "Onboarding checklist", "relevanceScore": 0.83 }],
                "resourceType": "listItem",
                "sensitivityLabel": { "displayName": "General" }
            }
        ]);
        let response: RetrievalResponse =
            serde_json::from_value(json!({ "retrievalHits": hits.clone() })).expect("parse");

        let rendered = response.render().expect("render");
        let back: Value = serde_json::from_str(&rendered).expect("json");
        assert_eq!(back, hits);
    }

    #[test]
    fn test_empty_hit_list_is_not_sentinel() {
        let response: RetrievalResponse =
            serde_json::from_value(json!({ "retrievalHits": [] })).expect("parse");
        assert_eq!(response.render().expect("render"), "[]");
    }
}
