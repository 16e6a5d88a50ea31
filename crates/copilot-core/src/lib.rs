//! # copilot-core
//!
//! The pure logic behind the Copilot Retrieval MCP bridge.
//!
//! Everything here is synchronous and side-effect free:
//! - `scope` - permission scopes accepted on the command line and their pairing rule
//! - `retrieval` - the Retrieval API request/response model and data-source inference
//! - `prompts` - the research prompt templates exposed over MCP
//! - `record` - the on-disk formats for the authentication record and token cache
//!
//! Network access, file I/O and the MCP runtime live in `apps/copilot-mcp`.

// =============================================================================
// MODULES
// =============================================================================

pub mod prompts;
pub mod record;
pub mod retrieval;
pub mod scope;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use prompts::{PROMPT_TEMPLATES, PromptKind, PromptTemplate};
pub use record::{
    AccessToken, AuthenticationRecord, RecordError, TokenCacheEntry, TokenCacheSlot,
};
pub use retrieval::{
    ConnectionItem, DataSource, DataSourceConfiguration, ExternalItemConfiguration,
    NO_HITS_MESSAGE, RetrievalError, RetrievalRequest, RetrievalResponse, infer_data_source,
};
pub use scope::{Scope, ScopeError, ScopeSet};
