//! # Copilot MCP Server
//!
//! Entry point for the MCP (Model Context Protocol) bridge to the
//! Microsoft 365 Copilot Retrieval API.
//!
//! ```text
//! ┌──────────────┐  MCP (stdio)  ┌─────────────┐  HTTPS  ┌─────────────────────┐
//! │  AI client   │ ◀───────────▶ │ copilot-mcp │ ──────▶ │ graph.microsoft.com │
//! └──────────────┘               └──────┬──────┘         └─────────────────────┘
//!                                       │ OAuth (PKCE, loopback)
//!                                       ▼
//!                               login.microsoftonline.com
//! ```
//!
//! Startup: parse and validate flags, acquire a credential (cached record or
//! interactive sign-in), then serve tools and prompts over stdio until the
//! client disconnects. Environment settings are listed in [`config`].

mod auth;
mod cli;
mod client;
mod config;
mod forwarder;
mod server;

use auth::{
    AuthError, BrowserLoginBroker, CredentialProvider, RecordStore, TokenCacheStore,
    platform_host_window,
};
use clap::Parser;
use client::CopilotClient;
use config::RuntimeConfig;
use copilot_core::ScopeError;
use forwarder::RetrievalForwarder;
use rmcp::{ServiceExt, transport::stdio};
use server::CopilotMcp;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Anything that stops the server from starting.
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    InvalidScopes(#[from] ScopeError),

    #[error("cannot build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("MCP transport error: {0}")]
    Transport(String),
}

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    init_tracing();

    // Exits with status 2 on malformed flags.
    let cli = cli::Cli::parse();

    if let Err(e) = run(cli).await {
        match &e {
            StartupError::InvalidScopes(_) => eprintln!("{e}"),
            _ => tracing::error!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr only; stdout carries the MCP transport.
/// `COPILOT_MCP_LOG_FORMAT=json` enables machine-parseable output.
fn init_tracing() {
    let log_format = std::env::var("COPILOT_MCP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "copilot_mcp=info,copilot_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(false),
                )
                .init();
        }
    }
}

async fn run(cli: cli::Cli) -> Result<(), StartupError> {
    let scopes = cli.validate()?;
    let config = RuntimeConfig::from_env();
    let tenant_id = cli.tenant_id.to_string();
    let client_id = cli.client_id.to_string();

    tracing::info!(
        tenant_id = %tenant_id,
        client_id = %client_id,
        scopes = %scopes,
        graph_url = %config.graph_url,
        "Copilot MCP server starting"
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!("copilot-mcp/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let broker = Arc::new(BrowserLoginBroker::new(
        http.clone(),
        config.authority_host.clone(),
        config.open_browser,
    ));
    let provider = CredentialProvider::new(
        broker,
        RecordStore::new(&config.record_file),
        TokenCacheStore::named(&config.token_cache_name),
        platform_host_window(),
    );

    let acquired = provider
        .acquire_credential(&tenant_id, &client_id, &scopes)
        .await?;
    if let Some(record) = acquired.credential().record().await {
        tracing::info!(
            cached = acquired.is_cached(),
            username = %record.username,
            "Credential ready"
        );
    }

    let client = CopilotClient::new(
        http,
        config.graph_url,
        acquired.into_credential(),
        scopes.graph_scopes(),
    );
    let mcp = CopilotMcp::new(RetrievalForwarder::new(client, scopes));

    let service = mcp
        .serve(stdio())
        .await
        .map_err(|e| StartupError::Transport(e.to_string()))?;

    let reason = service
        .waiting()
        .await
        .map_err(|e| StartupError::Transport(e.to_string()))?;
    tracing::info!("MCP session ended: {:?}", reason);
    Ok(())
}
