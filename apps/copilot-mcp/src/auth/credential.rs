//! Token acquisition for one account.

use super::broker::{LoginBroker, LoginRequest, RefreshRequest, TokenGrant};
use super::store::TokenCacheStore;
use super::window::WindowHandle;
use super::{AuthError, unix_now};
use async_trait::async_trait;
use copilot_core::{AccessToken, AuthenticationRecord, TokenCacheEntry};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tokens expiring within this window are treated as expired.
pub const EXPIRY_SKEW_SECS: u64 = 300;

/// Anything that can hand out bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError>;
}

/// What a credential needs to know about its application registration.
#[derive(Debug, Clone)]
pub struct CredentialOptions {
    pub tenant_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub window: Option<WindowHandle>,
    /// Account to bind to. `None` until the first sign-in.
    pub record: Option<AuthenticationRecord>,
}

struct MemoryToken {
    scopes: Vec<String>,
    token: AccessToken,
}

#[derive(Default)]
struct CredentialState {
    record: Option<AuthenticationRecord>,
    token: Option<MemoryToken>,
}

/// Credential that signs in through a [`LoginBroker`] and keeps its tokens in
/// a [`TokenCacheStore`] slot.
///
/// Lookup order for [`get_token`](TokenCredential::get_token): memory, slot
/// access token, slot refresh token, interactive login. Callers are
/// serialized so at most one refresh or login is in flight.
pub struct InteractiveBrowserCredential {
    tenant_id: String,
    client_id: String,
    redirect_uri: String,
    window: Option<WindowHandle>,
    broker: Arc<dyn LoginBroker>,
    slot: TokenCacheStore,
    state: Mutex<CredentialState>,
}

impl InteractiveBrowserCredential {
    pub fn new(options: CredentialOptions, broker: Arc<dyn LoginBroker>, slot: TokenCacheStore) -> Self {
        Self {
            tenant_id: options.tenant_id,
            client_id: options.client_id,
            redirect_uri: options.redirect_uri,
            window: options.window,
            broker,
            slot,
            state: Mutex::new(CredentialState {
                record: options.record,
                token: None,
            }),
        }
    }

    /// The account this credential is bound to, if any.
    pub async fn record(&self) -> Option<AuthenticationRecord> {
        self.state.lock().await.record.clone()
    }

    /// Run the interactive login and bind to the resulting account.
    pub async fn authenticate(&self, scopes: &[String]) -> Result<AuthenticationRecord, AuthError> {
        let mut state = self.state.lock().await;
        self.login(&mut state, scopes).await?;
        state
            .record
            .clone()
            .ok_or_else(|| AuthError::MalformedToken("sign-in produced no account".to_string()))
    }

    async fn login(&self, state: &mut CredentialState, scopes: &[String]) -> Result<AccessToken, AuthError> {
        let hint = state.record.as_ref().map(|r| r.username.clone());
        let request = LoginRequest {
            tenant_id: &self.tenant_id,
            client_id: &self.client_id,
            redirect_uri: &self.redirect_uri,
            scopes,
            window: self.window,
            login_hint: hint.as_deref().filter(|h| !h.is_empty()),
        };
        let (record, grant) = self.broker.interactive_login(&request).await?;
        tracing::info!(
            event = "interactive_login",
            username = %record.username,
            "Signed in"
        );

        self.persist(&record.home_account_id, scopes, &grant);
        state.record = Some(record);
        Ok(remember(state, scopes, grant.access_token))
    }

    /// Write tokens to the slot. Failures are logged only.
    fn persist(&self, home_account_id: &str, scopes: &[String], grant: &TokenGrant) {
        let result = self.slot.load().and_then(|mut slot| {
            slot.upsert(
                home_account_id,
                TokenCacheEntry {
                    refresh_token: grant.refresh_token.clone(),
                    access_token: Some(grant.access_token.clone()),
                    scopes: scopes.to_vec(),
                },
            );
            self.slot.save(&slot)
        });
        if let Err(e) = result {
            tracing::warn!(path = %self.slot.path().display(), "Failed to persist tokens: {}", e);
        }
    }

    /// Try the slot for the bound account: a fresh access token first, then
    /// a refresh. `None` means interactive login is needed.
    async fn slot_token(&self, state: &mut CredentialState, scopes: &[String], now: u64) -> Option<AccessToken> {
        let account = state.record.as_ref()?.home_account_id.clone();
        let entry = match self.slot.load() {
            Ok(slot) => slot.get(&account).cloned()?,
            Err(e) => {
                tracing::warn!("Token cache unavailable: {}", e);
                return None;
            }
        };

        if entry.scopes == scopes
            && let Some(token) = entry.access_token.filter(|t| t.is_fresh_at(now, EXPIRY_SKEW_SECS))
        {
            tracing::debug!(event = "credential_cache_hit", "Using cached access token");
            return Some(remember(state, scopes, token));
        }

        let refresh_token = entry.refresh_token?;
        let request = RefreshRequest {
            tenant_id: &self.tenant_id,
            client_id: &self.client_id,
            refresh_token: &refresh_token,
            scopes,
        };
        match self.broker.refresh(&request).await {
            Ok(grant) => {
                tracing::info!(event = "token_refresh", "Refreshed access token");
                self.persist(&account, scopes, &grant);
                Some(remember(state, scopes, grant.access_token))
            }
            Err(e) => {
                tracing::warn!(event = "token_refresh", "Silent refresh failed, signing in again: {}", e);
                if matches!(&e, AuthError::TokenEndpoint { error, .. } if error == "invalid_grant") {
                    self.forget(&account);
                }
                None
            }
        }
    }

    /// Drop a revoked or expired refresh token from the slot.
    fn forget(&self, home_account_id: &str) {
        let result = self.slot.load().and_then(|mut slot| {
            if slot.remove(home_account_id).is_some() {
                self.slot.save(&slot)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(path = %self.slot.path().display(), "Failed to drop stale tokens: {}", e);
        }
    }
}

fn remember(state: &mut CredentialState, scopes: &[String], token: AccessToken) -> AccessToken {
    state.token = Some(MemoryToken {
        scopes: scopes.to_vec(),
        token: token.clone(),
    });
    token
}

#[async_trait]
impl TokenCredential for InteractiveBrowserCredential {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        let mut state = self.state.lock().await;
        let now = unix_now();

        if let Some(memory) = &state.token
            && memory.scopes == scopes
            && memory.token.is_fresh_at(now, EXPIRY_SKEW_SECS)
        {
            return Ok(memory.token.clone());
        }

        if let Some(token) = self.slot_token(&mut state, scopes, now).await {
            return Ok(token);
        }
        self.login(&mut state, scopes).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use copilot_core::{TokenCacheSlot, record::RECORD_VERSION};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Broker that never touches the network and counts its calls.
    #[derive(Default)]
    pub(crate) struct FakeBroker {
        pub(crate) logins: AtomicUsize,
        pub(crate) refreshes: AtomicUsize,
        pub(crate) fail_refresh: bool,
        pub(crate) fail_login: bool,
    }

    pub(crate) fn test_record() -> AuthenticationRecord {
        AuthenticationRecord {
            username: "adele@contoso.com".to_string(),
            authority: "login.microsoftonline.com".to_string(),
            home_account_id: "uid.utid".to_string(),
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            version: RECORD_VERSION.to_string(),
        }
    }

    fn grant(token: &str) -> TokenGrant {
        TokenGrant {
            access_token: AccessToken {
                token: token.to_string(),
                expires_on: unix_now() + 3600,
            },
            refresh_token: Some("rt-new".to_string()),
        }
    }

    #[async_trait]
    impl LoginBroker for FakeBroker {
        async fn interactive_login(
            &self,
            _request: &LoginRequest<'_>,
        ) -> Result<(AuthenticationRecord, TokenGrant), AuthError> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if self.fail_login {
                return Err(AuthError::Denied {
                    error: "access_denied".to_string(),
                    description: "cancelled".to_string(),
                });
            }
            Ok((test_record(), grant("at-login")))
        }

        async fn refresh(&self, request: &RefreshRequest<'_>) -> Result<TokenGrant, AuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(AuthError::TokenEndpoint {
                    error: "invalid_grant".to_string(),
                    description: "expired".to_string(),
                });
            }
            assert_eq!(request.refresh_token, "rt-old");
            Ok(grant("at-refreshed"))
        }
    }

    fn options(record: Option<AuthenticationRecord>) -> CredentialOptions {
        CredentialOptions {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            redirect_uri: "http://localhost".to_string(),
            window: None,
            record,
        }
    }

    fn scopes() -> Vec<String> {
        vec!["https://graph.microsoft.com/ExternalItem.Read.All".to_string()]
    }

    fn seed_slot(store: &TokenCacheStore, expires_on: u64) {
        let mut slot = TokenCacheSlot::default();
        slot.upsert(
            "uid.utid",
            TokenCacheEntry {
                refresh_token: Some("rt-old".to_string()),
                access_token: Some(AccessToken {
                    token: "at-cached".to_string(),
                    expires_on,
                }),
                scopes: scopes(),
            },
        );
        store.save(&slot).expect("seed");
    }

    #[tokio::test]
    async fn test_valid_slot_token_skips_broker() {
        let dir = tempdir().expect("tempdir");
        let store = TokenCacheStore::new(dir.path().join("slot.json"));
        seed_slot(&store, unix_now() + 3600);
        let broker = Arc::new(FakeBroker::default());

        let credential = InteractiveBrowserCredential::new(options(Some(test_record())), broker.clone(), store);
        let token = credential.get_token(&scopes()).await.expect("token");

        assert_eq!(token.token, "at-cached");
        assert_eq!(broker.logins.load(Ordering::SeqCst), 0);
        assert_eq!(broker.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_silently() {
        let dir = tempdir().expect("tempdir");
        let store = TokenCacheStore::new(dir.path().join("slot.json"));
        seed_slot(&store, unix_now() + 60);
        let broker = Arc::new(FakeBroker::default());

        let credential =
            InteractiveBrowserCredential::new(options(Some(test_record())), broker.clone(), store.clone());
        let token = credential.get_token(&scopes()).await.expect("token");

        assert_eq!(token.token, "at-refreshed");
        assert_eq!(broker.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(broker.logins.load(Ordering::SeqCst), 0);

        let slot = store.load().expect("load");
        let entry = slot.get("uid.utid").expect("entry");
        assert_eq!(entry.refresh_token.as_deref(), Some("rt-new"));

        // Second call is served from memory.
        credential.get_token(&scopes()).await.expect("token");
        assert_eq!(broker.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_login() {
        let dir = tempdir().expect("tempdir");
        let store = TokenCacheStore::new(dir.path().join("slot.json"));
        seed_slot(&store, 0);
        let broker = Arc::new(FakeBroker {
            fail_refresh: true,
            ..FakeBroker::default()
        });

        let credential = InteractiveBrowserCredential::new(options(Some(test_record())), broker.clone(), store);
        let token = credential.get_token(&scopes()).await.expect("token");

        assert_eq!(token.token, "at-login");
        assert_eq!(broker.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_token_is_dropped_from_slot() {
        let dir = tempdir().expect("tempdir");
        let store = TokenCacheStore::new(dir.path().join("slot.json"));
        seed_slot(&store, 0);
        let broker = Arc::new(FakeBroker {
            fail_refresh: true,
            fail_login: true,
            ..FakeBroker::default()
        });

        let credential =
            InteractiveBrowserCredential::new(options(Some(test_record())), broker.clone(), store.clone());
        assert!(credential.get_token(&scopes()).await.is_err());

        assert!(store.load().expect("load").get("uid.utid").is_none());

        // Nothing left to refresh, so the next call goes straight to login.
        assert!(credential.get_token(&scopes()).await.is_err());
        assert_eq!(broker.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(broker.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_authenticate_binds_record_and_fills_slot() {
        let dir = tempdir().expect("tempdir");
        let store = TokenCacheStore::new(dir.path().join("slot.json"));
        let broker = Arc::new(FakeBroker::default());

        let credential = InteractiveBrowserCredential::new(options(None), broker.clone(), store.clone());
        assert!(credential.record().await.is_none());

        let record = credential.authenticate(&scopes()).await.expect("login");
        assert_eq!(record, test_record());
        assert_eq!(credential.record().await, Some(test_record()));
        assert!(store.load().expect("load").get("uid.utid").is_some());

        credential.get_token(&scopes()).await.expect("token");
        assert_eq!(broker.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_login() {
        let dir = tempdir().expect("tempdir");
        let store = TokenCacheStore::new(dir.path().join("slot.json"));
        let broker = Arc::new(FakeBroker::default());
        let credential = Arc::new(InteractiveBrowserCredential::new(options(None), broker.clone(), store));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let credential = credential.clone();
                tokio::spawn(async move { credential.get_token(&scopes()).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("token");
        }
        assert_eq!(broker.logins.load(Ordering::SeqCst), 1);
    }
}
