//! Google service-account authentication.
//!
//! Access tokens are obtained with the JWT bearer grant: an RS256-signed
//! assertion is exchanged at the token endpoint and cached until shortly
//! before it expires.

use crate::error::{Result, SheetError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::Mutex;
use vote_tracker_core::GoogleSheetsConfig;

/// OAuth scope for reading and writing spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are renewed this long before their stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

// =============================================================================
// Service Account Key
// =============================================================================

/// The fields of a service-account JSON key this crate needs.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: SecretString,
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parses a JSON key.
    ///
    /// # Errors
    /// Returns error if the JSON lacks `client_email` or `private_key`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| SheetError::Credentials(format!("invalid service-account key: {e}")))?;
        Ok(Self {
            client_email: raw.client_email,
            private_key: SecretString::from(raw.private_key),
        })
    }

    /// Loads the key from inline JSON, falling back to a file path.
    ///
    /// # Errors
    /// Returns [`SheetError::MissingCredentials`] when neither is configured.
    pub fn load(config: &GoogleSheetsConfig) -> Result<Self> {
        if let Some(json) = config.credentials_json.as_deref().filter(|j| !j.trim().is_empty()) {
            return Self::from_json(json);
        }
        if let Some(path) = config.credentials_path.as_deref().filter(|p| !p.trim().is_empty()) {
            let json = std::fs::read_to_string(path).map_err(|e| {
                SheetError::MissingCredentials(format!("cannot read key file {path}: {e}"))
            })?;
            return Self::from_json(&json);
        }
        Err(SheetError::MissingCredentials(
            "google.credentials_json or google.credentials_path must be set".to_string(),
        ))
    }
}

// =============================================================================
// Token Source
// =============================================================================

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for the Sheets API.
pub struct TokenSource(Source);

enum Source {
    /// Service-account JWT bearer grant with caching.
    ServiceAccount {
        client_email: String,
        signing_key: SigningKey<Sha256>,
        token_url: String,
        http: Client,
        cached: Mutex<Option<CachedToken>>,
    },
    /// Fixed token, for tests and pre-issued tokens.
    Static(SecretString),
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Source::ServiceAccount { client_email, token_url, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_email", client_email)
                .field("token_url", token_url)
                .finish_non_exhaustive(),
            Source::Static(_) => f.write_str("Static([REDACTED])"),
        }
    }
}

impl TokenSource {
    /// Creates a service-account source.
    ///
    /// # Errors
    /// Returns error if the private key is not PKCS#8 PEM.
    pub fn service_account(key: &ServiceAccountKey, token_url: impl Into<String>, http: Client) -> Result<Self> {
        let pem = key.private_key.expose_secret().replace("\\n", "\n");
        let private_key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .map_err(|e| SheetError::Credentials(format!("failed to parse private key: {e}")))?;

        Ok(Self(Source::ServiceAccount {
            client_email: key.client_email.clone(),
            signing_key: SigningKey::<Sha256>::new(private_key),
            token_url: token_url.into(),
            http,
            cached: Mutex::new(None),
        }))
    }

    /// Creates a source that always returns `token`.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self(Source::Static(SecretString::from(token.into())))
    }

    /// Returns a valid access token, fetching a new one when needed.
    ///
    /// # Errors
    /// Returns error if the token endpoint rejects the assertion.
    pub async fn token(&self) -> Result<String> {
        let (client_email, signing_key, token_url, http, cached) = match &self.0 {
            Source::Static(token) => return Ok(token.expose_secret().to_string()),
            Source::ServiceAccount {
                client_email,
                signing_key,
                token_url,
                http,
                cached,
            } => (client_email, signing_key, token_url, http, cached),
        };

        let mut guard = cached.lock().await;
        if let Some(cached) = guard.as_ref().filter(|c| Utc::now() < c.expires_at) {
            return Ok(cached.token.expose_secret().to_string());
        }

        let assertion = sign_assertion(signing_key, client_email, token_url, Utc::now().timestamp())?;
        let response = http
            .post(token_url.as_str())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SheetError::Credentials(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )));
        }

        let body: TokenResponse = serde_json::from_str(&response.text().await?)?;
        let lifetime = (body.expires_in - EXPIRY_MARGIN_SECS).max(0);
        tracing::debug!(expires_in = body.expires_in, "Google access token issued");

        let token = body.access_token.clone();
        *guard = Some(CachedToken {
            token: SecretString::from(body.access_token),
            expires_at: Utc::now() + Duration::seconds(lifetime),
        });
        Ok(token)
    }
}

/// Builds the signed `header.claims.signature` assertion.
fn sign_assertion(
    signing_key: &SigningKey<Sha256>,
    client_email: &str,
    audience: &str,
    issued_at: i64,
) -> Result<String> {
    let header = serde_json::to_vec(&JwtHeader { alg: "RS256", typ: "JWT" })?;
    let claims = serde_json::to_vec(&JwtClaims {
        iss: client_email,
        scope: SHEETS_SCOPE,
        aud: audience,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    })?;

    let signing_input = format!("{}.{}", BASE64_URL.encode(header), BASE64_URL.encode(claims));
    let signature = signing_key.sign(signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", BASE64_URL.encode(signature.to_bytes())))
}
