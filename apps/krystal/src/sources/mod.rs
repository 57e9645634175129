//! # Data Sources
//!
//! Clients for the third-party services Krystal draws relationship data
//! from:
//!
//! - `LittleSisClient` - entities and their connections
//! - `NewsClient` - news articles, trending topics, keyword entity extraction
//! - `OpenSecretsClient` - campaign funding and lobbying totals
//!
//! A client without an API key never touches the network and answers with
//! deterministic development fixtures. A client with a key calls the live
//! service; a failed call is logged and degrades to an empty result.

mod cache;
pub mod littlesis;
pub mod news;
pub mod opensecrets;

pub use cache::ResponseCache;
pub use littlesis::{Connection, LittleSisClient, LittleSisEntity};
pub use news::{Article, ExtractedEntity, NewsClient, TrendingTopic, extract_entities};
pub use opensecrets::{CandidateFunding, Contributor, OpenSecretsClient, OrganizationSummary};

use crate::config::SourcesConfig;
use serde_json::Value;
use std::time::Duration;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors from a live data-source call.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The service could not be reached.
    #[error("Cannot connect to {0}")]
    ConnectionFailed(String),
    /// 401/403 - invalid or missing API key.
    #[error("Unauthorized: invalid or missing API key")]
    Unauthorized,
    /// 429 Too Many Requests.
    #[error("Rate limited: too many requests")]
    RateLimited,
    /// Any other non-success status.
    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),
    /// The body was not the expected JSON.
    #[error("Parse error: {0}")]
    ParseError(String),
}

// =============================================================================
// CLIENT OPTIONS
// =============================================================================

/// Settings shared by every client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&SourcesConfig::default())
    }
}

impl From<&SourcesConfig> for ClientOptions {
    fn from(config: &SourcesConfig) -> Self {
        Self {
            cache_ttl: Duration::from_secs(config.cache_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

// =============================================================================
// HTTP PLUMBING
// =============================================================================

/// How a service expects its API key.
#[derive(Debug, Clone)]
pub(crate) enum Auth {
    Bearer(String),
    Header(&'static str, String),
    Query(&'static str, String),
}

/// A JSON-over-HTTP service endpoint with a response cache.
#[derive(Debug, Clone)]
pub(crate) struct HttpSource {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
    cache: ResponseCache,
}

impl HttpSource {
    pub(crate) fn new(base_url: impl Into<String>, auth: Auth, options: &ClientOptions) -> Self {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(concat!("krystal/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("HTTP client setup failed, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            cache: ResponseCache::new(options.cache_ttl),
        }
    }

    /// GET `path` with `query` and decode the JSON body, through the cache.
    pub(crate) async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let cache_key = cache_key(&url, query);
        if let Some(hit) = self.cache.get(&cache_key).await {
            tracing::debug!(url = %url, "Source cache hit");
            return Ok(hit);
        }

        let mut req = self.http.get(&url).query(query);
        req = match &self.auth {
            Auth::Bearer(key) => req.bearer_auth(key),
            Auth::Header(name, key) => req.header(*name, key),
            Auth::Query(name, key) => req.query(&[(*name, key)]),
        };

        let resp = req
            .send()
            .await
            .map_err(|e| SourceError::ConnectionFailed(format!("{}: {e}", self.base_url)))?;
        let value = handle_response(resp).await?;

        self.cache.insert(cache_key, value.clone()).await;
        Ok(value)
    }
}

/// Check the status code and parse the body.
async fn handle_response(resp: reqwest::Response) -> Result<Value, SourceError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::Unauthorized);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::ServerError(status.as_u16(), body));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| SourceError::ParseError(e.to_string()))
}

/// Cache key of a request. The API key is never part of it.
fn cache_key(url: &str, query: &[(&str, String)]) -> String {
    let mut key = url.to_string();
    for (name, value) in query {
        key.push_str(&format!("|{}={}", name, value));
    }
    key
}

/// Log a failed live call; callers then fall back to an empty result.
pub(crate) fn degrade(source: &str, operation: &str, err: &SourceError) {
    tracing::warn!(
        source = source,
        operation = operation,
        error = %err,
        "Data source call failed, returning empty result"
    );
}

// =============================================================================
// DATA SOURCES
// =============================================================================

/// All three clients, built from one configuration.
#[derive(Debug, Clone)]
pub struct DataSources {
    pub littlesis: LittleSisClient,
    pub news: NewsClient,
    pub opensecrets: OpenSecretsClient,
}

impl DataSources {
    #[must_use]
    pub fn from_config(config: &SourcesConfig) -> Self {
        let options = ClientOptions::from(config);
        Self {
            littlesis: LittleSisClient::new(config.littlesis_api_key.clone(), &options),
            news: NewsClient::new(config.news_api_key.clone(), &options),
            opensecrets: OpenSecretsClient::new(config.opensecrets_api_key.clone(), &options),
        }
    }

    /// Clients answering from fixtures only.
    #[must_use]
    pub fn fixtures() -> Self {
        Self::from_config(&SourcesConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
