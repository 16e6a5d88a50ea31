//! OAuth 2.0 plumbing for the Microsoft identity platform (v2.0 endpoints).
//!
//! Public-client authorization code flow with PKCE, plus refresh-token
//! redemption. Claims are read from the id token without signature checks:
//! the token arrives directly from the token endpoint over TLS and is only
//! used to label the account.

use super::AuthError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use copilot_core::{AuthenticationRecord, record::RECORD_VERSION};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

/// Scopes added to every request so the endpoint returns a refresh token
/// and an id token.
pub const OIDC_SCOPES: [&str; 3] = ["offline_access", "openid", "profile"];

// =============================================================================
// PKCE & STATE
// =============================================================================

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        Self::from_verifier(random_token(32))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// URL-safe random string from `len` bytes of OS entropy.
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Join requested scopes with the OIDC scopes, space separated.
pub fn scope_param(scopes: &[String]) -> String {
    scopes
        .iter()
        .map(String::as_str)
        .chain(OIDC_SCOPES)
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Authority host plus tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityEndpoints {
    pub authority_host: String,
    pub tenant_id: String,
}

impl AuthorityEndpoints {
    pub fn new(authority_host: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            authority_host: authority_host.into(),
            tenant_id: tenant_id.into(),
        }
    }

    pub fn authorize_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_host, self.tenant_id
        )
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }

    /// Host name stored in the authentication record.
    pub fn authority(&self) -> String {
        Url::parse(&self.authority_host)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.authority_host.clone())
    }

    /// Browser URL that starts the sign-in.
    pub fn sign_in_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
        pkce: &Pkce,
        login_hint: Option<&str>,
    ) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.authorize_url())
            .map_err(|e| AuthError::Redirect(format!("bad authority URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_mode", "query")
                .append_pair("scope", &scope_param(scopes))
                .append_pair("state", state)
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "S256")
                .append_pair("client_info", "1");
            match login_hint {
                Some(hint) => query.append_pair("login_hint", hint),
                None => query.append_pair("prompt", "select_account"),
            };
        }
        Ok(url)
    }
}

// =============================================================================
// TOKEN ENDPOINT
// =============================================================================

/// Successful token endpoint response.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub client_info: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// HTTP client for the token endpoint.
#[derive(Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoints: AuthorityEndpoints,
}

impl TokenClient {
    pub fn new(http: reqwest::Client, endpoints: AuthorityEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &AuthorityEndpoints {
        &self.endpoints
    }

    pub async fn redeem_code(
        &self,
        client_id: &str,
        code: &str,
        redirect_uri: &str,
        verifier: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, AuthError> {
        let scope = scope_param(scopes);
        self.post(&[
            ("client_id", client_id),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ])
        .await
    }

    pub async fn redeem_refresh_token(
        &self,
        client_id: &str,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, AuthError> {
        let scope = scope_param(scopes);
        self.post(&[
            ("client_id", client_id),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ])
        .await
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let resp = self
            .http
            .post(self.endpoints.token_url())
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&body)
                .map_err(|e| AuthError::MalformedToken(e.to_string()));
        }
        match serde_json::from_slice::<TokenErrorResponse>(&body) {
            Ok(err) => Err(AuthError::TokenEndpoint {
                error: err.error,
                description: err.error_description.unwrap_or_default(),
            }),
            Err(_) => Err(AuthError::TokenEndpoint {
                error: status.as_u16().to_string(),
                description: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

// =============================================================================
// ACCOUNT IDENTITY
// =============================================================================

#[derive(Deserialize)]
struct ClientInfo {
    uid: String,
    utid: String,
}

#[derive(Deserialize, Default)]
struct IdTokenClaims {
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    upn: Option<String>,
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    tid: Option<String>,
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(e.to_string()))
}

fn id_token_claims(id_token: &str) -> Result<IdTokenClaims, AuthError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::MalformedToken("id token is not a JWT".to_string()))?;
    serde_json::from_slice(&decode_segment(payload)?)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))
}

/// Build the authentication record for the account that just signed in.
///
/// The home account id is `uid.utid` from `client_info`, falling back to
/// the id token's `oid.tid`.
pub fn record_from_response(
    resp: &TokenResponse,
    endpoints: &AuthorityEndpoints,
    client_id: &str,
) -> Result<AuthenticationRecord, AuthError> {
    let claims = match &resp.id_token {
        Some(token) => id_token_claims(token)?,
        None => IdTokenClaims::default(),
    };

    let home_account_id = match &resp.client_info {
        Some(info) => {
            let info: ClientInfo = serde_json::from_slice(&decode_segment(info)?)
                .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
            format!("{}.{}", info.uid, info.utid)
        }
        None => match (&claims.oid, &claims.tid) {
            (Some(oid), Some(tid)) => format!("{oid}.{tid}"),
            _ => {
                return Err(AuthError::MalformedToken(
                    "response identifies no account".to_string(),
                ));
            }
        },
    };

    Ok(AuthenticationRecord {
        username: claims
            .preferred_username
            .or(claims.upn)
            .unwrap_or_default(),
        authority: endpoints.authority(),
        home_account_id,
        tenant_id: endpoints.tenant_id.clone(),
        client_id: client_id.to_string(),
        version: RECORD_VERSION.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
