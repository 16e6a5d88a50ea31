//! Interactive login.
//!
//! [`LoginBroker`] is the seam between token acquisition and whatever drives
//! the user through sign-in. [`BrowserLoginBroker`] runs the authorization
//! code flow in the system browser and catches the redirect on a loopback
//! listener.
//!
//! No timeout is imposed while waiting for the redirect.

use super::oauth::{AuthorityEndpoints, Pkce, TokenClient, TokenResponse, random_token, record_from_response};
use super::window::WindowHandle;
use super::{AuthError, unix_now};
use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use copilot_core::{AccessToken, AuthenticationRecord};
use serde::Deserialize;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

const SIGNED_IN_PAGE: &str = "<html><body><h3>Authentication complete.</h3>\
    <p>You can close this window and return to your MCP client.</p></body></html>";

const FAILED_PAGE: &str = "<html><body><h3>Authentication failed.</h3>\
    <p>Check the server log for details.</p></body></html>";

// =============================================================================
// BROKER CONTRACT
// =============================================================================

/// Parameters for an interactive sign-in.
#[derive(Debug, Clone)]
pub struct LoginRequest<'a> {
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    /// Registered redirect, without port.
    pub redirect_uri: &'a str,
    /// Graph-qualified scopes.
    pub scopes: &'a [String],
    pub window: Option<WindowHandle>,
    /// Pre-fills the account picker when re-authenticating a known user.
    pub login_hint: Option<&'a str>,
}

/// Parameters for a silent refresh.
#[derive(Debug, Clone)]
pub struct RefreshRequest<'a> {
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub refresh_token: &'a str,
    pub scopes: &'a [String],
}

/// Tokens issued by the identity provider.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: AccessToken,
    /// Absent when the provider did not rotate the refresh token.
    pub refresh_token: Option<String>,
}

impl TokenGrant {
    fn from_response(resp: &TokenResponse, now: u64) -> Self {
        Self {
            access_token: AccessToken {
                token: resp.access_token.clone(),
                expires_on: now.saturating_add(resp.expires_in),
            },
            refresh_token: resp.refresh_token.clone(),
        }
    }
}

/// Drives sign-in and token refresh.
#[async_trait]
pub trait LoginBroker: Send + Sync {
    /// Sign the user in. May block on user interaction.
    async fn interactive_login(
        &self,
        request: &LoginRequest<'_>,
    ) -> Result<(AuthenticationRecord, TokenGrant), AuthError>;

    /// Redeem a refresh token without user interaction.
    async fn refresh(&self, request: &RefreshRequest<'_>) -> Result<TokenGrant, AuthError>;
}

// =============================================================================
// BROWSER BROKER
// =============================================================================

/// Authorization code + PKCE in the system browser, redirect caught on
/// `127.0.0.1`.
#[derive(Clone)]
pub struct BrowserLoginBroker {
    http: reqwest::Client,
    authority_host: String,
    open_browser: bool,
}

impl BrowserLoginBroker {
    pub fn new(http: reqwest::Client, authority_host: impl Into<String>, open_browser: bool) -> Self {
        Self {
            http,
            authority_host: authority_host.into(),
            open_browser,
        }
    }

    fn token_client(&self, tenant_id: &str) -> TokenClient {
        TokenClient::new(
            self.http.clone(),
            AuthorityEndpoints::new(self.authority_host.clone(), tenant_id),
        )
    }
}

#[async_trait]
impl LoginBroker for BrowserLoginBroker {
    async fn interactive_login(
        &self,
        request: &LoginRequest<'_>,
    ) -> Result<(AuthenticationRecord, TokenGrant), AuthError> {
        let tokens = self.token_client(request.tenant_id);
        let pkce = Pkce::generate();
        let state = random_token(16);

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("{}:{port}", request.redirect_uri);

        let url = tokens.endpoints().sign_in_url(
            request.client_id,
            &redirect_uri,
            request.scopes,
            &state,
            &pkce,
            request.login_hint,
        )?;

        if let Some(handle) = request.window {
            tracing::debug!(window = handle.0, "Host window available for sign-in");
        }
        tracing::info!(event = "interactive_login", port, "Waiting for sign-in");
        eprintln!("To sign in to Microsoft 365, open this URL in a browser:\n\n  {url}\n");
        if self.open_browser
            && let Err(e) = launch_browser(url.as_str())
        {
            tracing::warn!("Could not open a browser automatically: {}", e);
        }

        let code = wait_for_redirect(listener, &state).await?;
        let resp = tokens
            .redeem_code(
                request.client_id,
                &code,
                &redirect_uri,
                &pkce.verifier,
                request.scopes,
            )
            .await?;

        let record = record_from_response(&resp, tokens.endpoints(), request.client_id)?;
        Ok((record, TokenGrant::from_response(&resp, unix_now())))
    }

    async fn refresh(&self, request: &RefreshRequest<'_>) -> Result<TokenGrant, AuthError> {
        let resp = self
            .token_client(request.tenant_id)
            .redeem_refresh_token(request.client_id, request.refresh_token, request.scopes)
            .await?;
        Ok(TokenGrant::from_response(&resp, unix_now()))
    }
}

// =============================================================================
// LOOPBACK REDIRECT
// =============================================================================

/// Query parameters of the authorization response.
#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

type RedirectOutcome = Result<String, AuthError>;

#[derive(Clone)]
struct RedirectContext {
    expected_state: Arc<str>,
    outcome: Arc<Mutex<Option<oneshot::Sender<RedirectOutcome>>>>,
}

/// Serve the loopback listener until a request carries the authorization
/// response. Connections are served concurrently.
async fn wait_for_redirect(listener: TcpListener, state: &str) -> RedirectOutcome {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let context = RedirectContext {
        expected_state: Arc::from(state),
        outcome: Arc::new(Mutex::new(Some(outcome_tx))),
    };
    let app = Router::new()
        .route("/", get(handle_redirect))
        .with_state(context);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::debug!("Loopback listener stopped: {}", e);
        }
    });

    let outcome = outcome_rx
        .await
        .unwrap_or_else(|_| Err(AuthError::Redirect("loopback listener closed".to_string())));
    let _ = shutdown_tx.send(());
    outcome
}

async fn handle_redirect(
    State(context): State<RedirectContext>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, Html<&'static str>) {
    let (status, page, outcome) = match check_redirect(params, &context.expected_state) {
        Ok(None) => return (StatusCode::NOT_FOUND, Html("")),
        Ok(Some(code)) => (StatusCode::OK, SIGNED_IN_PAGE, Ok(code)),
        Err(e) => (StatusCode::BAD_REQUEST, FAILED_PAGE, Err(e)),
    };
    if let Some(sender) = context.outcome.lock().await.take() {
        let _ = sender.send(outcome);
    }
    (status, Html(page))
}

/// Interpret the authorization response.
///
/// `Ok(None)` means the request is unrelated and the listener should keep
/// waiting.
fn check_redirect(params: RedirectParams, expected_state: &str) -> Result<Option<String>, AuthError> {
    if params.code.is_none() && params.error.is_none() {
        return Ok(None);
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    if let Some(error) = params.error {
        return Err(AuthError::Denied {
            error,
            description: params.error_description.unwrap_or_default(),
        });
    }
    Ok(params.code)
}

/// Open `url` in the user's browser. Output is discarded so nothing reaches
/// the MCP transport on stdout.
fn launch_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("rundll32");
        c.args(["url.dll,FileProtocolHandler", url]);
        c
    };
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn params(query: &str) -> RedirectParams {
        let uri: axum::http::Uri = format!("http://localhost/?{query}").parse().expect("uri");
        Query::<RedirectParams>::try_from_uri(&uri).expect("query").0
    }

    #[test]
    fn test_redirect_with_code() {
        assert_eq!(
            check_redirect(params("code=abc&state=s1&session_state=x"), "s1").ok(),
            Some(Some("abc".to_string()))
        );
    }

    #[test]
    fn test_unrelated_request_is_ignored() {
        assert_eq!(check_redirect(RedirectParams::default(), "s1").ok(), Some(None));
    }

    #[test]
    fn test_wrong_state_is_rejected() {
        assert!(matches!(
            check_redirect(params("code=abc&state=forged"), "s1"),
            Err(AuthError::StateMismatch)
        ));
        assert!(matches!(
            check_redirect(params("code=abc"), "s1"),
            Err(AuthError::StateMismatch)
        ));
    }

    #[test]
    fn test_error_redirect_is_denied() {
        match check_redirect(
            params("error=access_denied&error_description=User+cancelled&state=s1"),
            "s1",
        ) {
            Err(AuthError::Denied { error, description }) => {
                assert_eq!(error, "access_denied");
                assert_eq!(description, "User cancelled");
            }
            other => unreachable!("unexpected: {other:?}"),
        }
    }

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
        let base = format!("http://127.0.0.1:{}", listener.local_addr().expect("addr").port());
        (listener, base)
    }

    #[tokio::test]
    async fn test_loopback_waits_past_unrelated_requests() {
        let (listener, base) = listen().await;
        let waiter = tokio::spawn(async move { wait_for_redirect(listener, "st").await });

        let favicon = reqwest::get(format!("{base}/favicon.ico")).await.expect("favicon");
        assert_eq!(favicon.status(), reqwest::StatusCode::NOT_FOUND);
        let bare = reqwest::get(format!("{base}/")).await.expect("bare");
        assert_eq!(bare.status(), reqwest::StatusCode::NOT_FOUND);

        let done = reqwest::get(format!("{base}/?code=the-code&state=st")).await.expect("redirect");
        assert_eq!(done.status(), reqwest::StatusCode::OK);
        assert!(done.text().await.expect("body").contains("Authentication complete."));

        let code = waiter.await.expect("join").expect("code");
        assert_eq!(code, "the-code");
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_redirect() {
        let (listener, base) = listen().await;
        let addr = listener.local_addr().expect("addr");
        let waiter = tokio::spawn(async move { wait_for_redirect(listener, "st").await });

        // Browsers open speculative connections and may never send on them.
        let _idle = tokio::net::TcpStream::connect(addr).await.expect("connect");

        let done = reqwest::get(format!("{base}/?code=the-code&state=st")).await.expect("redirect");
        assert_eq!(done.status(), reqwest::StatusCode::OK);

        let code = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("redirect handled while idle connection is open")
            .expect("join")
            .expect("code");
        assert_eq!(code, "the-code");
    }

    #[tokio::test]
    async fn test_loopback_reports_denial() {
        let (listener, base) = listen().await;
        let waiter = tokio::spawn(async move { wait_for_redirect(listener, "st").await });

        let page = reqwest::get(format!("{base}/?error=access_denied&state=st")).await.expect("denial");
        assert_eq!(page.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(matches!(
            waiter.await.expect("join"),
            Err(AuthError::Denied { .. })
        ));
    }

    #[test]
    fn test_grant_expiry_is_absolute() {
        let resp: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "expires_in": 3600
        }))
        .expect("parse");
        let grant = TokenGrant::from_response(&resp, 1_000);
        assert_eq!(grant.access_token.expires_on, 4_600);
        assert!(grant.refresh_token.is_none());
    }
}
