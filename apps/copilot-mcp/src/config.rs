//! # Runtime Configuration
//!
//! Endpoints and file locations, read once from the environment.
//!
//! - `COPILOT_MCP_GRAPH_URL` - Graph base URL (default: `https://graph.microsoft.com/beta`)
//! - `COPILOT_MCP_AUTHORITY_HOST` - Entra ID host (default: `https://login.microsoftonline.com`)
//! - `COPILOT_MCP_RECORD_FILE` - authentication record path (default: `TokenCache`)
//! - `COPILOT_MCP_TOKEN_CACHE_NAME` - token cache slot name (default: `TokenCache`)
//! - `COPILOT_MCP_NO_BROWSER` - if set, print the login URL without opening a browser
//!
//! `COPILOT_MCP_LOG_FORMAT` is read by `main` before anything else.

use std::path::PathBuf;

pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/beta";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_CACHE_NAME: &str = "TokenCache";

/// Redirect registered for the public client. Entra ID accepts any port on
/// `http://localhost`, so the loopback listener appends its own.
pub const REDIRECT_URI: &str = "http://localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub graph_url: String,
    pub authority_host: String,
    pub record_file: PathBuf,
    pub token_cache_name: String,
    pub open_browser: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            record_file: PathBuf::from(DEFAULT_CACHE_NAME),
            token_cache_name: DEFAULT_CACHE_NAME.to_string(),
            open_browser: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            graph_url: get("COPILOT_MCP_GRAPH_URL")
                .map(|v| trim_url(&v))
                .unwrap_or(defaults.graph_url),
            authority_host: get("COPILOT_MCP_AUTHORITY_HOST")
                .map(|v| trim_url(&v))
                .unwrap_or(defaults.authority_host),
            record_file: get("COPILOT_MCP_RECORD_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.record_file),
            token_cache_name: get("COPILOT_MCP_TOKEN_CACHE_NAME")
                .unwrap_or(defaults.token_cache_name),
            open_browser: get("COPILOT_MCP_NO_BROWSER").is_none(),
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(RuntimeConfig::from_lookup(lookup(&[])), RuntimeConfig::default());
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("COPILOT_MCP_GRAPH_URL", "http://127.0.0.1:9000/beta/"),
            ("COPILOT_MCP_AUTHORITY_HOST", " https://login.microsoftonline.us/ "),
            ("COPILOT_MCP_RECORD_FILE", "/tmp/record.json"),
            ("COPILOT_MCP_NO_BROWSER", "1"),
        ]));
        assert_eq!(config.graph_url, "http://127.0.0.1:9000/beta");
        assert_eq!(config.authority_host, "https://login.microsoftonline.us");
        assert_eq!(config.record_file, PathBuf::from("/tmp/record.json"));
        assert_eq!(config.token_cache_name, DEFAULT_CACHE_NAME);
        assert!(!config.open_browser);
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("COPILOT_MCP_GRAPH_URL", ""),
            ("COPILOT_MCP_NO_BROWSER", "  "),
        ]));
        assert_eq!(config.graph_url, DEFAULT_GRAPH_URL);
        assert!(config.open_browser);
    }
}
