//! Poll fetcher for the BStage Plus survey API.
//!
//! Each fetch pulls poll metadata (unauthenticated) and the live results
//! (bearer token). Metadata failures keep the last known metadata; results
//! failures yield no reading for the tick.

use crate::auth::{SessionManager, SPACE_HEADER};
use crate::error::{BstageError, Result};
use crate::types::{RawPollMetadata, RawPollResults};
use chrono::{FixedOffset, Utc};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use parking_lot::Mutex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use vote_tracker_core::{AppConfig, Candidate, PollMetadata, Snapshot};

/// Extra attempts allowed after the results endpoint rejects the token.
pub const MAX_AUTH_RETRIES: u32 = 1;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`PollFetcher`].
#[derive(Debug, Clone)]
pub struct PollFetcherConfig {
    pub app_url: String,
    pub poll_id: String,
    pub space_id: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout: Duration,
    /// Offset applied to snapshot timestamps.
    pub snapshot_offset: FixedOffset,
}

impl PollFetcherConfig {
    /// Builds a fetcher config from the application config.
    ///
    /// # Errors
    /// Returns error if the snapshot offset is out of range.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let snapshot_offset = config
            .snapshot_offset()
            .map_err(|e| BstageError::Configuration(e.to_string()))?;
        Ok(Self {
            app_url: config.bstage.app_url.trim_end_matches('/').to_string(),
            poll_id: config.poll.poll_id.clone(),
            space_id: config.bstage.space_id.clone(),
            requests_per_minute: NonZeroU32::new(config.poll.requests_per_minute)
                .unwrap_or(nonzero!(120u32)),
            timeout: Duration::from_secs(config.poll.request_timeout_secs),
            snapshot_offset,
        })
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = url.into();
        self
    }

    fn poll_url(&self) -> String {
        format!("{}/svc/survey/api/v1/polls/{}", self.app_url, self.poll_id)
    }
}

/// One successful fetch: the snapshot plus the metadata in effect.
#[derive(Debug, Clone)]
pub struct PollReading {
    pub snapshot: Snapshot,
    pub metadata: PollMetadata,
}

// =============================================================================
// PollFetcher
// =============================================================================

/// Fetches poll metadata and results, owning the token-retry budget.
pub struct PollFetcher {
    config: PollFetcherConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    session: Arc<SessionManager>,
    known_metadata: Mutex<PollMetadata>,
}

impl std::fmt::Debug for PollFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollFetcher")
            .field("app_url", &self.config.app_url)
            .field("poll_id", &self.config.poll_id)
            .finish_non_exhaustive()
    }
}

impl PollFetcher {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: PollFetcherConfig, session: Arc<SessionManager>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BstageError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            session,
            known_metadata: Mutex::new(PollMetadata::default()),
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Last metadata successfully fetched.
    #[must_use]
    pub fn known_metadata(&self) -> PollMetadata {
        self.known_metadata.lock().clone()
    }

    /// Fetches metadata and results as one reading.
    ///
    /// Returns `None` when the results cannot be obtained. A metadata failure
    /// alone does not fail the reading; the last known metadata is used.
    pub async fn fetch(&self) -> Option<PollReading> {
        let metadata = match self.fetch_metadata().await {
            Some(fresh) => {
                *self.known_metadata.lock() = fresh.clone();
                fresh
            }
            None => self.known_metadata(),
        };

        let candidates = self.fetch_results().await?;
        let timestamp = Utc::now().with_timezone(&self.config.snapshot_offset);
        let snapshot = Snapshot::new(timestamp, candidates);

        tracing::debug!(
            candidates = snapshot.candidates.len(),
            total = snapshot.total,
            "Poll fetched"
        );

        Some(PollReading { snapshot, metadata })
    }

    /// Fetches poll metadata. No authentication required.
    pub async fn fetch_metadata(&self) -> Option<PollMetadata> {
        match self.get_json::<RawPollMetadata>(&self.config.poll_url(), None).await {
            Ok(raw) => Some(raw.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Metadata fetch failed");
                None
            }
        }
    }

    /// Fetches live results, refreshing the session at most
    /// [`MAX_AUTH_RETRIES`] times when the token is rejected.
    pub async fn fetch_results(&self) -> Option<Vec<Candidate>> {
        if !self.session.ensure_valid().await {
            tracing::warn!("No valid BStage session, skipping results fetch");
            return None;
        }

        let url = format!("{}/results", self.config.poll_url());
        let mut retries_left = MAX_AUTH_RETRIES;

        loop {
            let token = self.session.access_token().await?;
            match self.get_json::<RawPollResults>(&url, Some(&token)).await {
                Ok(raw) => {
                    return Some(
                        raw.question_option_results
                            .into_iter()
                            .map(Candidate::from)
                            .collect(),
                    )
                }
                Err(BstageError::Unauthorized) if retries_left > 0 => {
                    retries_left -= 1;
                    tracing::warn!("Results returned 401, refreshing session");
                    if !self.session.refresh().await {
                        return None;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Results fetch failed");
                    return None;
                }
            }
        }
    }

    /// Waits for the rate limiter and makes a GET request.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, bearer: Option<&str>) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("GET {}", url);

        let mut request = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .header(SPACE_HEADER, &self.config.space_id);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        handle_response(response).await
    }
}

/// Maps HTTP status to [`BstageError`] and decodes the body.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.as_u16() == 401 {
        return Err(BstageError::Unauthorized);
    }

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return Err(BstageError::rate_limit(retry_after));
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(BstageError::api(status.as_u16(), text));
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POLL_PATH: &str = "/svc/survey/api/v1/polls/poll-1";
    const RESULTS_PATH: &str = "/svc/survey/api/v1/polls/poll-1/results";
    const REFRESH_PATH: &str = "/svc/account/api/v1/auth/token/refresh";

    fn app_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.poll.poll_id = "poll-1".to_string();
        config.bstage.email = "fan@example.com".to_string();
        config.bstage.password = "hunter2".to_string();
        config
    }

    fn fetcher(server: &MockServer) -> PollFetcher {
        let config = app_config();
        let session_config =
            SessionConfig::from_config(&config.bstage, 5).with_base_url(server.uri());
        let session = Arc::new(SessionManager::new(session_config).unwrap());
        let fetcher_config = PollFetcherConfig::from_config(&config)
            .unwrap()
            .with_base_url(server.uri());
        PollFetcher::new(fetcher_config, session).unwrap()
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/bstage/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "accessToken": "account-token" })),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/bstage/oauth/authorize"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "code": "c0de" })),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/svc/account/api/v1/auth/token/social"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "access-1",
                "refreshToken": "refresh-1"
            })))
            .mount(server)
            .await;
    }

    fn results_body() -> serde_json::Value {
        serde_json::json!({
            "questionOptionResults": [
                {
                    "questionOptionId": "a",
                    "content": "T1 Doran",
                    "images": ["https://img/a.png"],
                    "numberOfSelectors": 1200
                },
                {
                    "questionOptionId": "b",
                    "content": "Hanwha Life Esports Gumayusi",
                    "numberOfSelectors": 1000
                }
            ]
        })
    }

    fn metadata_body() -> serde_json::Value {
        serde_json::json!({
            "title": "Weekly Pick",
            "body": "Vote now",
            "mainImage": "https://img/main.png"
        })
    }

    #[test]
    fn test_config_from_app_config() {
        let config = PollFetcherConfig::from_config(&app_config()).unwrap();
        assert_eq!(config.poll_url(), "https://bstageplus.com/svc/survey/api/v1/polls/poll-1");
        assert_eq!(config.requests_per_minute.get(), 120);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.snapshot_offset.local_minus_utc(), 7 * 3600);
    }

    #[tokio::test]
    async fn test_fetch_builds_snapshot() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path(POLL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
            .mount(&server)
            .await;

        let reading = fetcher(&server).fetch().await.unwrap();
        assert_eq!(reading.metadata.title, "Weekly Pick");
        assert_eq!(reading.snapshot.total, 2200);
        assert_eq!(reading.snapshot.candidates.len(), 2);
        assert_eq!(reading.snapshot.candidates[1].image_url, "");
        assert_eq!(reading.snapshot.timestamp.offset().local_minus_utc(), 7 * 3600);
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "access-2",
                "refreshToken": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .and(header("authorization", "Bearer access-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
            .expect(1)
            .mount(&server)
            .await;

        let candidates = fetcher(&server).fetch_results().await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_unauthorized_is_bounded() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "access-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        assert!(fetcher(&server).fetch_results().await.is_none());
    }

    #[tokio::test]
    async fn test_results_server_error_yields_none() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        assert!(fetcher(&server).fetch().await.is_none());
    }

    #[tokio::test]
    async fn test_login_failure_skips_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/bstage/auth/login"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = fetcher(&server);
        assert!(fetcher.fetch_results().await.is_none());
        assert!(fetcher.session().last_error().is_some());
    }

    #[tokio::test]
    async fn test_metadata_failure_keeps_previous() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path(POLL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(POLL_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RESULTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body()))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server);
        let first = fetcher.fetch().await.unwrap();
        let second = fetcher.fetch().await.unwrap();
        assert_eq!(first.metadata.title, "Weekly Pick");
        assert_eq!(second.metadata, first.metadata);
    }
}
