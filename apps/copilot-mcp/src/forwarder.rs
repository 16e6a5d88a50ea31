//! Tool arguments in, rendered retrieval hits out.

use crate::client::{ClientError, CopilotClient};
use copilot_core::retrieval::MAX_QUERY_LENGTH;
use copilot_core::{DataSource, RetrievalError, RetrievalRequest, ScopeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    /// Arguments the service would reject. Nothing was sent.
    #[error(transparent)]
    InvalidParams(#[from] RetrievalError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("cannot serialize retrieval hits: {0}")]
    Render(#[from] serde_json::Error),
}

/// Builds retrieval requests against the scope set the process was started
/// with and forwards them. No retries.
#[derive(Clone)]
pub struct RetrievalForwarder {
    client: CopilotClient,
    scopes: ScopeSet,
}

impl RetrievalForwarder {
    pub fn new(client: CopilotClient, scopes: ScopeSet) -> Self {
        Self { client, scopes }
    }

    pub async fn retrieve(
        &self,
        query: String,
        data_source: Option<DataSource>,
        connection_ids: Option<Vec<String>>,
        maximum_number_of_results: Option<i64>,
    ) -> Result<String, ForwardError> {
        let request = RetrievalRequest::build(
            query,
            data_source,
            connection_ids,
            maximum_number_of_results,
            &self.scopes,
        )?;

        if request.query_exceeds_limit() {
            tracing::warn!(
                chars = request.query_string.chars().count(),
                limit = MAX_QUERY_LENGTH,
                "Query exceeds the documented length limit; forwarding anyway"
            );
        }

        let response = self.client.retrieve(&request).await?;
        let hits = response.retrieval_hits.as_ref().map_or(0, Vec::len);
        tracing::info!(
            event = "retrieval",
            data_source = ?request.data_source,
            max_results = request.maximum_number_of_results,
            hits,
            "Retrieval completed"
        );
        Ok(response.render()?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
