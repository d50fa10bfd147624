//! GitHub REST API client
//!
//! Only two resources are used: `repos/{name}` to confirm a repository
//! exists at startup and `repos/{name}/events` on every poll.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, error, info};

use super::ApiError;
use crate::config::GithubConfig;

/// Status code and decoded JSON body of an API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The `message` field GitHub puts in error bodies
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

/// Access to the repository hosting API
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// GET a resource path relative to the API root (e.g. `repos/o/r/events`)
    async fn request(&self, path: &str) -> Result<ApiResponse, ApiError>;

    /// Check that a repository exists and is reachable
    ///
    /// Any failure (missing repository, rate limiting, transport error)
    /// counts as "does not exist"; the reason is logged.
    async fn repository_exists(&self, name: &str) -> bool {
        let response = match self.request(&format!("repos/{}", name)).await {
            Ok(response) => response,
            Err(e) => {
                error!(repository = %name, error = %e, "Failed to check repository");
                return false;
            }
        };

        let full_name = response.body.get("full_name").and_then(Value::as_str);
        match response.message() {
            _ if response.is_ok() && full_name == Some(name) => {
                info!(repository = %name, "Successfully found repository");
                true
            }
            Some("Not Found") => {
                error!(repository = %name, "Repository does not exist, check the configuration");
                false
            }
            Some(message) if message.contains("API rate limit exceeded") => {
                error!(repository = %name, "API rate limit exceeded");
                false
            }
            _ => {
                error!(
                    repository = %name,
                    status = response.status,
                    "GitHub response came in unexpected format"
                );
                false
            }
        }
    }
}

/// API credential, chosen once per process and never mutated
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    /// No authorization header; subject to the anonymous rate limit
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Pick one token at random from a comma-delimited list
    ///
    /// Spreading processes over several tokens spreads the rate limit.
    pub fn from_token_list(list: &str) -> Self {
        let tokens: Vec<&str> = list.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        debug!(count = tokens.len(), "Credentials::from_token_list: called");
        match tokens.choose(&mut rand::rng()) {
            Some(token) => Self::token(*token),
            None => Self::anonymous(),
        }
    }

    /// Read the token list from an environment variable
    pub fn from_env(var: &str) -> Self {
        std::env::var(var)
            .map(|list| Self::from_token_list(&list))
            .unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("token {}", t))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_some() { "<redacted>" } else { "<none>" };
        f.debug_struct("Credentials").field("token", &token).finish()
    }
}

/// reqwest-backed GitHub client
pub struct GithubClient {
    base_url: String,
    http: Client,
}

impl GithubClient {
    /// Create a client; the credential is baked into the default headers
    pub fn from_config(config: &GithubConfig, credentials: Credentials) -> Result<Self, ApiError> {
        debug!(base_url = %config.base_url, ?credentials, "GithubClient::from_config: called");

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(auth) = credentials.authorization() {
            let mut value = HeaderValue::from_str(&auth).map_err(|_| ApiError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RepositoryApi for GithubClient {
    async fn request(&self, path: &str) -> Result<ApiResponse, ApiError> {
        let url = self.url(path);
        debug!(%url, "GithubClient::request: called");

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout { path: path.to_string() }
            } else {
                ApiError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;

        debug!(%url, status, "GithubClient::request: done");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned reply for a path
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Json(u16, Value),
        Timeout,
    }

    /// Mock API: replies are consumed in order, the last one repeats
    #[derive(Default)]
    pub struct MockApi {
        replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
        call_count: AtomicUsize,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, path: &str, reply: MockReply) -> Self {
            self.replies
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RepositoryApi for MockApi {
        async fn request(&self, path: &str) -> Result<ApiResponse, ApiError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                match replies.get_mut(path) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };

            match reply {
                Some(MockReply::Json(status, body)) => Ok(ApiResponse::new(status, body)),
                Some(MockReply::Timeout) => Err(ApiError::Timeout { path: path.to_string() }),
                None => Ok(ApiResponse::new(404, serde_json::json!({"message": "Not Found"}))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockApi, MockReply};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_from_token_list() {
        let creds = Credentials::from_token_list("abc");
        assert_eq!(creds.authorization().as_deref(), Some("token abc"));

        let creds = Credentials::from_token_list("a,b,c");
        let auth = creds.authorization().unwrap();
        assert!(["token a", "token b", "token c"].contains(&auth.as_str()));
    }

    #[test]
    fn test_credentials_empty_list_is_anonymous() {
        assert!(!Credentials::from_token_list("").is_authenticated());
        assert!(!Credentials::from_token_list(" , ,").is_authenticated());
        assert_eq!(Credentials::from_token_list(",x,").authorization().as_deref(), Some("token x"));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let debug = format!("{:?}", Credentials::token("secret"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_client_url_joining() {
        let config = GithubConfig {
            base_url: "https://api.github.com/".to_string(),
            ..Default::default()
        };
        let client = GithubClient::from_config(&config, Credentials::anonymous()).unwrap();
        assert_eq!(client.url("repos/o/r/events"), "https://api.github.com/repos/o/r/events");
        assert_eq!(client.url("/repos/o/r"), "https://api.github.com/repos/o/r");
    }

    #[test]
    fn test_api_response_message() {
        let response = ApiResponse::new(403, json!({"message": "API rate limit exceeded for 1.2.3.4"}));
        assert!(!response.is_ok());
        assert!(response.message().unwrap().contains("rate limit"));
    }

    #[tokio::test]
    async fn test_repository_exists() {
        let api = MockApi::new().reply(
            "repos/kubernetes/metrics",
            MockReply::Json(200, json!({"full_name": "kubernetes/metrics"})),
        );
        assert!(api.repository_exists("kubernetes/metrics").await);
    }

    #[tokio::test]
    async fn test_repository_exists_name_mismatch() {
        // Renamed repositories redirect to a different full_name
        let api = MockApi::new().reply("repos/old/name", MockReply::Json(200, json!({"full_name": "new/name"})));
        assert!(!api.repository_exists("old/name").await);
    }

    #[tokio::test]
    async fn test_repository_exists_failures() {
        let api = MockApi::new()
            .reply(
                "repos/limited/repo",
                MockReply::Json(403, json!({"message": "API rate limit exceeded for 1.2.3.4"})),
            )
            .reply("repos/down/repo", MockReply::Timeout);

        assert!(!api.repository_exists("missing/repo").await);
        assert!(!api.repository_exists("limited/repo").await);
        assert!(!api.repository_exists("down/repo").await);
        assert_eq!(api.call_count(), 3);
    }
}
