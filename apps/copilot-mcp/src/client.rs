//! # Copilot Retrieval Client
//!
//! Wrapper around the Microsoft Graph Copilot Retrieval API for use by the
//! MCP server.

use crate::auth::{AuthError, TokenCredential};
use copilot_core::{RetrievalRequest, RetrievalResponse};
use std::sync::Arc;
use thiserror::Error;

/// Errors from the HTTP client layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Cannot reach Microsoft Graph.
    #[error("Cannot connect to Microsoft Graph at {0}")]
    ConnectionFailed(String),

    /// 401 - the bearer token was rejected.
    #[error("Unauthorized: the access token was rejected")]
    Unauthorized,

    /// 403 - signed in, but not allowed to read the requested content.
    #[error("Forbidden: the account lacks permission for this request")]
    Forbidden,

    /// 429 Too Many Requests.
    #[error("Rate limited: too many requests")]
    RateLimited,

    /// Any other 4xx.
    #[error("Request rejected ({0}): {1}")]
    ClientError(u16, String),

    /// Server returned a 5xx error.
    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    /// Failed to parse response body.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No token could be obtained.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// HTTP client for the Retrieval API.
#[derive(Clone)]
pub struct CopilotClient {
    http: reqwest::Client,
    base_url: String,
    credential: Arc<dyn TokenCredential>,
    /// Graph-qualified scopes requested for every token.
    scopes: Vec<String>,
}

impl CopilotClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            credential,
            scopes,
        }
    }

    /// Map status codes to errors and parse the JSON body.
    async fn handle_response(resp: reqwest::Response) -> Result<RetrievalResponse, ClientError> {
        let status = resp.status();
        match status {
            reqwest::StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
            reqwest::StatusCode::FORBIDDEN => return Err(ClientError::Forbidden),
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(ClientError::RateLimited),
            _ => {}
        }
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ClientError(status.as_u16(), body));
        }
        if status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ServerError(status.as_u16(), body));
        }
        resp.json::<RetrievalResponse>()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }

    /// POST /copilot/retrieval
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResponse, ClientError> {
        let token = self.credential.get_token(&self.scopes).await?;
        let url = format!("{}/copilot/retrieval", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token.token)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))?;
        Self::handle_response(resp).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
