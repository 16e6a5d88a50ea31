//! # Command Line
//!
//! ```text
//! copilot-mcp --tenant-id <GUID> --client-id <GUID> --scopes <SCOPE>...
//! ```
//!
//! Clap handles presence and GUID syntax. Scope values are checked
//! afterwards by [`Cli::validate`] so the messages match the scope rules in
//! `copilot_core::scope`.

use clap::{ArgAction, Parser};
use copilot_core::{ScopeError, ScopeSet};
use uuid::Uuid;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Microsoft Graph MCP Server
///
/// Serves the Microsoft 365 Copilot Retrieval API to MCP clients over stdio.
#[derive(Parser, Debug)]
#[command(name = "copilot-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The Azure AD tenant ID
    #[arg(long)]
    pub tenant_id: Uuid,

    /// The Azure AD application client ID
    #[arg(long)]
    pub client_id: Uuid,

    /// List of scopes for the authentication context. Scopes depend on the
    /// data sources you want to use in the Retrieve method:
    /// ExternalItem.Read.All for externalItem, Files.Read.All & Sites.Read.All
    /// for sharePoint & oneDriveBusiness
    #[arg(long, required = true, num_args = 1.., action = ArgAction::Append)]
    pub scopes: Vec<String>,
}

impl Cli {
    /// Check `--scopes` against the accepted values and the pairing rule.
    pub fn validate(&self) -> Result<ScopeSet, ScopeError> {
        ScopeSet::parse(&self.scopes)
    }
}

// =============================================================================
// TESTS
// =============================================================================
