//! # Authentication Module
//!
//! Acquires a bearer-token credential for Microsoft Graph.
//!
//! ## Flow
//!
//! ```text
//! record file ──found──▶ credential bound to record ──▶ Cached
//!      │
//!      └─absent/corrupt─▶ interactive login ──▶ write record ──▶ Fresh
//! ```
//!
//! Tokens for a signed-in account are kept in a named token cache slot, so a
//! cached record can refresh silently instead of prompting again.
//!
//! - `store` - record file and token cache slot I/O
//! - `oauth` - PKCE, authorize URL, token endpoint client
//! - `broker` - the interactive login seam and its loopback browser impl
//! - `credential` - token acquisition for an account
//! - `provider` - the cache-then-login entry point
//! - `window` - host window lookup for attaching login UI

mod broker;
mod credential;
mod oauth;
mod provider;
mod store;
mod window;

pub use broker::BrowserLoginBroker;
pub use credential::TokenCredential;
pub use provider::CredentialProvider;
pub use store::{CacheError, RecordStore, TokenCacheStore};
pub use window::platform_host_window;

use copilot_core::RecordError;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Authentication failures. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user or the identity provider refused the sign-in.
    #[error("sign-in was denied: {error}: {description}")]
    Denied { error: String, description: String },

    /// The redirect carried a `state` that this process did not issue.
    #[error("sign-in redirect did not match the pending request")]
    StateMismatch,

    /// The redirect could not be understood.
    #[error("invalid sign-in redirect: {0}")]
    Redirect(String),

    /// The token endpoint answered with an OAuth error.
    #[error("token endpoint rejected the request: {error}: {description}")]
    TokenEndpoint { error: String, description: String },

    #[error("identity provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("login listener failed: {0}")]
    Io(#[from] std::io::Error),

    /// A token or claim blob could not be decoded.
    #[error("malformed token response: {0}")]
    MalformedToken(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<RecordError> for AuthError {
    fn from(e: RecordError) -> Self {
        Self::MalformedToken(e.to_string())
    }
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
