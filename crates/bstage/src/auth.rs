//! BStage Plus session management.
//!
//! A session is obtained through a four-step chain:
//!
//! 1. `GET {account}/oauth/authorize` to seed session cookies
//! 2. `POST {account}/api/v1/bstage/auth/login` with email/password
//! 3. `POST {account}/api/v1/bstage/oauth/authorize` to get a one-time code
//! 4. `POST {app}/svc/account/api/v1/auth/token/social` to swap the code for
//!    an access/refresh pair
//!
//! Tokens are leased for a fixed window shorter than the provider TTL and
//! renewed proactively. All callers share one critical section, so concurrent
//! expirations cause a single login.

use crate::error::{BstageError, Result};
use crate::types::{
    AccountLoginResponse, AuthorizeRequest, AuthorizeResponse, LoginRequest, RefreshRequest,
    SocialTokenRequest, TokenPairResponse,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use vote_tracker_core::BstageConfig;

// =============================================================================
// Constants
// =============================================================================

const OAUTH_SCOPE: &str = "openid profile email";
const OAUTH_STATE: &str = "state";
const SOCIAL_TYPE: &str = "BSTAGE";

/// Header carrying the space id on app-service requests.
pub const SPACE_HEADER: &str = "x-bmf-sid";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`SessionManager`].
#[derive(Clone)]
pub struct SessionConfig {
    pub account_url: String,
    pub app_url: String,
    pub space_id: String,
    pub redirect_uri: String,
    pub email: String,
    pub password: SecretString,
    /// How long a freshly issued token is trusted.
    pub token_lease: Duration,
    pub timeout: Duration,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("account_url", &self.account_url)
            .field("app_url", &self.app_url)
            .field("space_id", &self.space_id)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("token_lease", &self.token_lease)
            .finish()
    }
}

impl SessionConfig {
    /// Builds a session config from the `[bstage]` section.
    #[must_use]
    pub fn from_config(config: &BstageConfig, timeout_secs: u64) -> Self {
        Self {
            account_url: config.account_url.trim_end_matches('/').to_string(),
            app_url: config.app_url.trim_end_matches('/').to_string(),
            space_id: config.space_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            email: config.email.clone(),
            password: SecretString::from(config.password.clone()),
            token_lease: Duration::from_secs(config.token_lease_secs),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Points both services at one base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.account_url = url.clone();
        self.app_url = url;
        self
    }

    #[must_use]
    pub fn with_token_lease(mut self, lease: Duration) -> Self {
        self.token_lease = lease;
        self
    }

    fn client_id(&self) -> String {
        format!("space_{}", self.space_id)
    }

    fn has_credentials(&self) -> bool {
        !self.email.is_empty() && !self.password.expose_secret().is_empty()
    }
}

// =============================================================================
// Session
// =============================================================================

/// An issued token pair with its local expiry.
struct Session {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn new(access_token: String, refresh_token: Option<String>, lease: Duration) -> Self {
        let lease = chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            access_token: SecretString::from(access_token),
            refresh_token: refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            expires_at: Utc::now() + lease,
        }
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Counters exposed for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub logins: u64,
    pub refreshes: u64,
    pub failures: u64,
}

// =============================================================================
// SessionManager
// =============================================================================

/// Owns the BStage session and renews it on demand.
pub struct SessionManager {
    config: SessionConfig,
    http: Client,
    session: Mutex<Option<Session>>,
    last_error: SyncMutex<Option<String>>,
    logins: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("account_url", &self.config.account_url)
            .field("email", &self.config.email)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager without logging in.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let http = build_client(config.timeout, false)?;
        Ok(Self {
            config,
            http,
            session: Mutex::new(None),
            last_error: SyncMutex::new(None),
            logins: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        })
    }

    /// Ensures a valid session exists, logging in if needed.
    ///
    /// A caller that waited on the lock re-checks validity first, so only one
    /// login runs per expiry.
    pub async fn ensure_valid(&self) -> bool {
        let mut guard = self.session.lock().await;
        if guard.as_ref().is_some_and(|s| s.is_valid_at(Utc::now())) {
            return true;
        }
        self.login_locked(&mut guard).await
    }

    /// Runs the full login chain, replacing any current session.
    pub async fn login(&self) -> bool {
        let mut guard = self.session.lock().await;
        self.login_locked(&mut guard).await
    }

    /// Trades the refresh token for a new pair, falling back to a full login.
    pub async fn refresh(&self) -> bool {
        let mut guard = self.session.lock().await;

        let refreshed = match guard.as_ref() {
            Some(session) if session.refresh_token.is_some() => self.refresh_chain(session).await,
            _ => {
                tracing::debug!("No refresh token available, performing full login");
                return self.login_locked(&mut guard).await;
            }
        };

        match refreshed {
            Ok(session) => {
                *guard = Some(session);
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                *self.last_error.lock() = None;
                tracing::info!("BStage token refreshed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, falling back to full login");
                self.login_locked(&mut guard).await
            }
        }
    }

    /// Current access token, if a session exists.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.access_token.expose_secret().to_string())
    }

    /// Most recent authentication failure, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            logins: self.logins.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    async fn login_locked(&self, slot: &mut Option<Session>) -> bool {
        match self.login_chain().await {
            Ok(session) => {
                *slot = Some(session);
                self.logins.fetch_add(1, Ordering::Relaxed);
                *self.last_error.lock() = None;
                tracing::info!(email = %self.config.email, "BStage login successful");
                true
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "BStage login failed");
                *self.last_error.lock() = Some(e.to_string());
                false
            }
        }
    }

    async fn login_chain(&self) -> Result<Session> {
        if !self.config.has_credentials() {
            return Err(BstageError::Configuration(
                "bstage.email and bstage.password must be set".to_string(),
            ));
        }

        // Cookies from step 1 must flow through steps 2 and 3, so each chain
        // gets its own jar.
        let http = build_client(self.config.timeout, true)?;
        let client_id = self.config.client_id();
        let account = &self.config.account_url;

        tracing::debug!("Login step 1: seeding authorize session");
        let seed = http
            .get(format!("{account}/oauth/authorize"))
            .query(&[
                ("clientId", client_id.as_str()),
                ("responseType", "code"),
                ("scope", OAUTH_SCOPE),
                ("state", OAUTH_STATE),
                ("redirectUri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        tracing::debug!(status = seed.status().as_u16(), "Authorize page loaded");

        tracing::debug!("Login step 2: account login");
        let response = http
            .post(format!("{account}/api/v1/bstage/auth/login"))
            .json(&LoginRequest {
                email: &self.config.email,
                password: self.config.password.expose_secret(),
            })
            .send()
            .await?;
        let login: AccountLoginResponse = expect_json(response, "login").await?;

        tracing::debug!("Login step 3: OAuth authorize");
        let response = http
            .post(format!("{account}/api/v1/bstage/oauth/authorize"))
            .bearer_auth(&login.access_token)
            .json(&AuthorizeRequest {
                client_id: &client_id,
                response_type: "code",
                scope: OAUTH_SCOPE,
                state: OAUTH_STATE,
                redirect_uri: &self.config.redirect_uri,
            })
            .send()
            .await?;
        let authorize: AuthorizeResponse = expect_json(response, "OAuth authorize").await?;

        tracing::debug!("Login step 4: token exchange");
        let response = http
            .post(format!(
                "{}/svc/account/api/v1/auth/token/social",
                self.config.app_url
            ))
            .header(SPACE_HEADER, &self.config.space_id)
            .json(&SocialTokenRequest {
                code: &authorize.code,
                state: OAUTH_STATE,
                social_type: SOCIAL_TYPE,
                redirect_uri: &self.config.redirect_uri,
            })
            .send()
            .await?;
        let tokens: TokenPairResponse = expect_json(response, "token exchange").await?;

        let access_token = tokens
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BstageError::Authentication("token exchange returned no access token".to_string()))?;

        Ok(Session::new(
            access_token,
            tokens.refresh_token,
            self.config.token_lease,
        ))
    }

    async fn refresh_chain(&self, current: &Session) -> Result<Session> {
        let refresh_token = current
            .refresh_token
            .as_ref()
            .ok_or_else(|| BstageError::Authentication("no refresh token".to_string()))?;

        let response = self
            .http
            .post(format!(
                "{}/svc/account/api/v1/auth/token/refresh",
                self.config.app_url
            ))
            .header(SPACE_HEADER, &self.config.space_id)
            .json(&RefreshRequest {
                access_token: current.access_token.expose_secret(),
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;
        let tokens: TokenPairResponse = expect_json(response, "token refresh").await?;

        let access_token = tokens
            .access_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| current.access_token.expose_secret().to_string());
        let refresh_token = tokens
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| Some(refresh_token.expose_secret().to_string()));

        Ok(Session::new(access_token, refresh_token, self.config.token_lease))
    }
}

fn build_client(timeout: Duration, cookies: bool) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .cookie_store(cookies)
        .build()
        .map_err(|e| BstageError::Network(format!("failed to build HTTP client: {e}")))
}

/// Decodes a successful chain response, naming the step on failure.
async fn expect_json<T: DeserializeOwned>(response: reqwest::Response, step: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(BstageError::auth_step(step, status.as_u16(), text));
    }
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| BstageError::Authentication(format!("{step} returned an unexpected body: {e}")))
}
