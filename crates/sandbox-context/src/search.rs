//! The host-side counterpart of the `web_search` tool: sandboxes never
//! hold a search API key themselves (the container's `web_search.sh`
//! curls `host.docker.internal:<port>/api/tools/search`), so the actual
//! outbound HTTP call to a real search provider happens here, invoked by
//! `sandbox-gateway`'s `/api/tools/search` handler.
//!
//! Grounded on the retry-free, single-attempt HTTP client style of
//! `sandbox-core::llm::client` (same `reqwest::Client`/timeout shape,
//! without the retry policy an interactive search call doesn't need) and
//! on the `from_toml`/`with_env_overrides` configuration pattern
//! `search_config.rs` established.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ContextError;

/// Configuration for the upstream search provider the web-search proxy
/// forwards to.
#[derive(Clone)]
pub struct SearchProviderConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub default_max_results: u32,
    pub timeout: Duration,
}

impl Default for SearchProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.search.brave.com/res/v1/web/search".to_string(),
            api_key: None,
            default_max_results: 5,
            timeout: Duration::from_secs(10),
        }
    }
}

impl SearchProviderConfig {
    /// Applies `SANDBOX_SEARCH_*` environment overrides, mirroring
    /// `sandbox_core::config::SandboxConfig::with_env_overrides`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SANDBOX_SEARCH_BASE_URL") {
            self.base_url = val;
        }
        if let Ok(val) = std::env::var("SANDBOX_SEARCH_API_KEY") {
            self.api_key = Some(SecretString::from(val));
        }
        if let Ok(val) = std::env::var("SANDBOX_SEARCH_MAX_RESULTS") {
            if let Ok(n) = val.parse() {
                self.default_max_results = n;
            }
        }
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct SearchClient {
    http: reqwest::Client,
    config: SearchProviderConfig,
}

impl SearchClient {
    pub fn new(config: SearchProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client builder should not fail with only a timeout set");
        Self { http, config }
    }

    /// Only present for tests that need to point the client at a wiremock
    /// server instead of the real provider endpoint.
    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Forwards a query to the configured provider. `max_results` is
    /// clamped to at least 1.
    pub async fn search(&self, query: &str, max_results: Option<u32>) -> Result<Vec<SearchResult>, ContextError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ContextError::MissingApiKey)?;
        let count = max_results.unwrap_or(self.config.default_max_results).max(1);

        let response = self
            .http
            .get(&self.config.base_url)
            .header("X-Subscription-Token", api_key.expose_secret())
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(ContextError::Http)?;

        if !response.status().is_success() {
            return Err(ContextError::Provider(format!(
                "search provider returned {}",
                response.status()
            )));
        }

        let body: BraveSearchResponse = response.json().await.map_err(ContextError::Http)?;
        Ok(body
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .map(|r| SearchResult { title: r.title, url: r.url, snippet: r.description.unwrap_or_default() })
            .collect())
    }
}

#[derive(Debug, Default, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_without_api_key_fails_fast() {
        let client = SearchClient::new(SearchProviderConfig::default());
        let err = client.search("rust async", None).await.unwrap_err();
        assert!(matches!(err, ContextError::MissingApiKey));
    }

    #[tokio::test]
    async fn search_parses_results_and_sends_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(header("X-Subscription-Token", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": {
                    "results": [
                        {"title": "Rust async book", "url": "https://rust-lang.github.io/async-book/", "description": "An introduction"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let config = SearchProviderConfig {
            api_key: Some(SecretString::from("test-key".to_string())),
            ..SearchProviderConfig::default()
        };
        let client = SearchClient::new(config).with_base_url(format!("{}/res/v1/web/search", server.uri()));

        let results = client.search("rust async", Some(3)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rust async book");
    }
}
