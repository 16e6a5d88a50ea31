//! Startup credential acquisition: reuse the persisted record or sign in.

use super::broker::LoginBroker;
use super::credential::{CredentialOptions, InteractiveBrowserCredential, TokenCredential};
use super::store::{RecordLoad, RecordStore, TokenCacheStore};
use super::window::HostWindow;
use super::AuthError;
use crate::config::REDIRECT_URI;
use copilot_core::{AuthenticationRecord, ScopeSet};
use std::sync::Arc;

/// Result of [`CredentialProvider::acquire_credential`].
pub enum AcquiredCredential {
    /// Bound to a record read from disk. No login happened.
    Cached(Arc<InteractiveBrowserCredential>),
    /// Produced by an interactive login that just completed.
    Fresh(Arc<InteractiveBrowserCredential>),
}

impl AcquiredCredential {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub fn credential(&self) -> &Arc<InteractiveBrowserCredential> {
        match self {
            Self::Cached(c) | Self::Fresh(c) => c,
        }
    }

    pub fn into_credential(self) -> Arc<dyn TokenCredential> {
        match self {
            Self::Cached(c) | Self::Fresh(c) => c,
        }
    }
}

pub struct CredentialProvider {
    broker: Arc<dyn LoginBroker>,
    records: RecordStore,
    slot: TokenCacheStore,
    window: Box<dyn HostWindow>,
}

impl CredentialProvider {
    pub fn new(
        broker: Arc<dyn LoginBroker>,
        records: RecordStore,
        slot: TokenCacheStore,
        window: Box<dyn HostWindow>,
    ) -> Self {
        Self {
            broker,
            records,
            slot,
            window,
        }
    }

    /// Load the record file, or run an interactive login and write it.
    ///
    /// A missing or undecodable record, or one issued for another tenant or
    /// client, is a cache miss. Other read failures are returned.
    pub async fn acquire_credential(
        &self,
        tenant_id: &str,
        client_id: &str,
        scopes: &ScopeSet,
    ) -> Result<AcquiredCredential, AuthError> {
        let path = self.records.path().display().to_string();
        match self.records.load()? {
            RecordLoad::Found(record) if record.matches(tenant_id, client_id) => {
                tracing::info!(
                    event = "credential_cache_hit",
                    username = %record.username,
                    %path,
                    "Using cached authentication record"
                );
                let credential = self.credential(tenant_id, client_id, Some(record));
                return Ok(AcquiredCredential::Cached(Arc::new(credential)));
            }
            RecordLoad::Found(_) => tracing::info!(
                event = "credential_cache_miss",
                %path,
                "Cached record belongs to another tenant or client"
            ),
            RecordLoad::Absent => tracing::info!(
                event = "credential_cache_miss",
                %path,
                "No cached authentication record"
            ),
            RecordLoad::Corrupt(detail) => tracing::warn!(
                event = "credential_cache_miss",
                %path,
                "Ignoring unreadable authentication record: {}",
                detail
            ),
        }

        let credential = self.credential(tenant_id, client_id, None);
        let record = credential.authenticate(&scopes.graph_scopes()).await?;
        self.records.save(&record)?;
        tracing::info!(%path, "Authentication record saved");
        Ok(AcquiredCredential::Fresh(Arc::new(credential)))
    }

    fn credential(
        &self,
        tenant_id: &str,
        client_id: &str,
        record: Option<AuthenticationRecord>,
    ) -> InteractiveBrowserCredential {
        let options = CredentialOptions {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            window: self.window.try_get_host_window_handle(),
            record,
        };
        InteractiveBrowserCredential::new(options, self.broker.clone(), self.slot.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================
