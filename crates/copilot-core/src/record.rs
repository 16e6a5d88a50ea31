//! # Credential Formats
//!
//! Serialized shapes for the two files the credential provider keeps:
//!
//! - the **authentication record**: who signed in, with which tenant and
//!   client; stored verbatim in the record file
//! - the **token cache slot**: refresh/access tokens keyed by home account id;
//!   this is what lets a cached record mint tokens without a new login
//!
//! File I/O operations are in the app layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Version written into new authentication records.
pub const RECORD_VERSION: &str = "1.0";

/// Version written into new token cache slots.
pub const SLOT_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed credential data: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for RecordError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

// =============================================================================
// AUTHENTICATION RECORD
// =============================================================================

/// Descriptor of a completed interactive login.
///
/// Holds no secrets. Tokens for the account live in the [`TokenCacheSlot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRecord {
    pub username: String,
    pub authority: String,
    pub home_account_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub version: String,
}

impl AuthenticationRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a record, rejecting unknown versions and blank identifiers.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_slice(bytes)?;
        if record.version != RECORD_VERSION {
            return Err(RecordError::Malformed(format!(
                "unsupported record version {}",
                record.version
            )));
        }
        if record.home_account_id.is_empty() || record.client_id.is_empty() {
            return Err(RecordError::Malformed(
                "record is missing account or client id".to_string(),
            ));
        }
        Ok(record)
    }

    /// Whether this record was issued for the given tenant and client.
    #[must_use]
    pub fn matches(&self, tenant_id: &str, client_id: &str) -> bool {
        self.tenant_id.eq_ignore_ascii_case(tenant_id)
            && self.client_id.eq_ignore_ascii_case(client_id)
    }
}

// =============================================================================
// TOKENS
// =============================================================================

/// Bearer token plus its absolute expiry (Unix seconds).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: u64,
}

impl AccessToken {
    /// Usable at `now` with at least `skew_secs` left.
    #[must_use]
    pub fn is_fresh_at(&self, now: u64, skew_secs: u64) -> bool {
        self.expires_on > now.saturating_add(skew_secs)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Tokens held for one account.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl fmt::Debug for TokenCacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCacheEntry")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token)
            .field("scopes", &self.scopes)
            .finish()
    }
}

// =============================================================================
// TOKEN CACHE SLOT
// =============================================================================

/// Contents of a named persistence slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCacheSlot {
    pub version: u8,
    #[serde(default)]
    pub accounts: BTreeMap<String, TokenCacheEntry>,
}

impl Default for TokenCacheSlot {
    fn default() -> Self {
        Self {
            version: SLOT_VERSION,
            accounts: BTreeMap::new(),
        }
    }
}

impl TokenCacheSlot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let slot: Self = serde_json::from_slice(bytes)?;
        if slot.version != SLOT_VERSION {
            return Err(RecordError::Malformed(format!(
                "unsupported token cache version {}",
                slot.version
            )));
        }
        Ok(slot)
    }

    #[must_use]
    pub fn get(&self, home_account_id: &str) -> Option<&TokenCacheEntry> {
        self.accounts.get(home_account_id)
    }

    /// Replace the entry for an account. A refresh token already held is
    /// kept when the new entry carries none.
    pub fn upsert(&mut self, home_account_id: &str, mut entry: TokenCacheEntry) {
        if entry.refresh_token.is_none()
            && let Some(previous) = self.accounts.get(home_account_id)
        {
            entry.refresh_token.clone_from(&previous.refresh_token);
        }
        self.accounts.insert(home_account_id.to_string(), entry);
    }

    pub fn remove(&mut self, home_account_id: &str) -> Option<TokenCacheEntry> {
        self.accounts.remove(home_account_id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
