//! Wire types for the BStage Plus account and survey APIs.

use serde::{Deserialize, Serialize};
use vote_tracker_core::{Candidate, PollMetadata};

/// Name used when an option carries no display text.
pub const UNKNOWN_CANDIDATE: &str = "Unknown";

// =============================================================================
// Authentication
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizeRequest<'a> {
    pub client_id: &'a str,
    pub response_type: &'a str,
    pub scope: &'a str,
    pub state: &'a str,
    pub redirect_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SocialTokenRequest<'a> {
    pub code: &'a str,
    pub state: &'a str,
    pub social_type: &'a str,
    pub redirect_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub access_token: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountLoginResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeResponse {
    pub code: String,
}

/// Access/refresh pair issued by the app service.
///
/// Refresh responses may omit either field; missing values keep the old token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenPairResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// =============================================================================
// Survey
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPollMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub main_image: Option<String>,
}

impl From<RawPollMetadata> for PollMetadata {
    fn from(raw: RawPollMetadata) -> Self {
        Self {
            title: raw.title.unwrap_or_default(),
            body: raw.body.unwrap_or_default(),
            image: raw.main_image.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPollResults {
    #[serde(default)]
    pub question_option_results: Vec<RawOptionResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawOptionResult {
    /// Upstream sends either a string or a number here.
    #[serde(default)]
    pub question_option_id: serde_json::Value,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub number_of_selectors: Option<u64>,
}

impl From<RawOptionResult> for Candidate {
    fn from(raw: RawOptionResult) -> Self {
        let id = match raw.question_option_id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        let name = raw
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string());

        Self {
            id,
            name,
            image_url: raw.images.into_iter().next().unwrap_or_default(),
            votes: raw.number_of_selectors.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_result_conversion() {
        let raw: RawOptionResult = serde_json::from_value(serde_json::json!({
            "questionOptionId": "opt-1",
            "content": "T1 Doran",
            "images": ["https://img/1.png", "https://img/2.png"],
            "numberOfSelectors": 2596698
        }))
        .unwrap();

        let candidate = Candidate::from(raw);
        assert_eq!(candidate.id, "opt-1");
        assert_eq!(candidate.name, "T1 Doran");
        assert_eq!(candidate.image_url, "https://img/1.png");
        assert_eq!(candidate.votes, 2_596_698);
    }

    #[test]
    fn test_option_result_defaults() {
        let raw: RawOptionResult = serde_json::from_value(serde_json::json!({
            "questionOptionId": 42
        }))
        .unwrap();

        let candidate = Candidate::from(raw);
        assert_eq!(candidate.id, "42");
        assert_eq!(candidate.name, UNKNOWN_CANDIDATE);
        assert_eq!(candidate.image_url, "");
        assert_eq!(candidate.votes, 0);
    }

    #[test]
    fn test_metadata_conversion() {
        let raw: RawPollMetadata = serde_json::from_value(serde_json::json!({
            "title": "Weekly Pick",
            "mainImage": "https://img/main.png"
        }))
        .unwrap();

        let metadata = PollMetadata::from(raw);
        assert_eq!(metadata.title, "Weekly Pick");
        assert_eq!(metadata.body, "");
        assert_eq!(metadata.image, "https://img/main.png");
    }

    #[test]
    fn test_token_pair_partial() {
        let raw: TokenPairResponse =
            serde_json::from_value(serde_json::json!({ "accessToken": "new" })).unwrap();
        assert_eq!(raw.access_token.as_deref(), Some("new"));
        assert!(raw.refresh_token.is_none());
    }
}
