//! The retrying HTTP client. Grounded on `generation/llm_provider.rs`'s
//! provider-dispatch shape, but implemented directly over `reqwest` because
//! no provider SDK exposes the retry contract this needs.

use crate::config::LlmConfig;
use crate::errors::LlmError;
use crate::llm::dialect::Provider;
use crate::llm::CompletionRequest;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_ATTEMPTS: u32 = 3;

pub struct LlmClient {
    http: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = Provider::from_config_str(&config.provider).unwrap_or(Provider::Anthropic);
        Self::with_endpoint(config, provider.endpoint().to_string())
    }

    /// Construct a client against a non-default endpoint. Used by tests to
    /// point at a local mock server; production callers should use [`new`]
    /// so the fixed provider endpoints are used.
    fn with_endpoint(config: &LlmConfig, endpoint: String) -> Result<Self, LlmError> {
        let provider = Provider::from_config_str(&config.provider).unwrap_or(Provider::Anthropic);
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(LlmError::Transport)?;
        Ok(Self {
            http,
            provider,
            model: config.model.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            endpoint,
        })
    }

    /// `chat(system, user, opts) -> text | error`, with a retry policy of:
    /// 429 honours `Retry-After`, 5xx/timeout use exponential backoff
    /// `base * 2^attempt`, 401 and other 4xx fail fast, capped at 3 total
    /// attempts.
    pub async fn chat(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let body = self.provider.body(&self.model, &request);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(&body).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt >= MAX_ATTEMPTS || !err.is_retryable() => return Err(err),
                Err(err) => {
                    let delay = match &err {
                        LlmError::RateLimited { retry_after_ms } => Duration::from_millis(*retry_after_ms),
                        _ => BASE_BACKOFF * 2u32.pow(attempt - 1),
                    };
                    warn!(attempt, ?delay, "retrying LLM request after transient error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<String, LlmError> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/json");
        for (name, value) in self.provider.auth_headers(&self.api_key) {
            req = req.header(name, value);
        }

        let response = match req.json(body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(LlmError::Timeout),
            Err(e) => return Err(LlmError::Transport(e)),
        };

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(2 * BASE_BACKOFF.as_millis() as u64);
            return Err(LlmError::RateLimited { retry_after_ms });
        }
        if status.as_u16() == 401 {
            return Err(LlmError::AuthFailed);
        }
        if status.is_server_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::ServerError(LlmError::preview(&detail)));
        }
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::UnexpectedResponse {
                preview: LlmError::preview(&detail),
            });
        }

        let json: serde_json::Value = response.json().await.map_err(LlmError::Transport)?;
        debug!("LLM response received");
        self.provider.extract_text(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: "anthropic".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            api_key: Some("test-key".to_string()),
            max_tokens: 4096,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn rate_limit_then_success_retries_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"content": [{"type": "text", "text": "ok"}]})),
            )
            .mount(&server)
            .await;

        let client = LlmClient::with_endpoint(&test_config(), server.uri()).unwrap();
        let result = client.chat(CompletionRequest::new("sys", "usr")).await.unwrap();
        assert_eq!(result, "ok");
    }

    #[tokio::test]
    async fn auth_failure_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::with_endpoint(&test_config(), server.uri()).unwrap();
        let err = client.chat(CompletionRequest::new("sys", "usr")).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed));
    }

    #[tokio::test]
    async fn server_error_exhausts_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = LlmClient::with_endpoint(&test_config(), server.uri()).unwrap();
        let err = client.chat(CompletionRequest::new("sys", "usr")).await.unwrap_err();
        assert!(matches!(err, LlmError::ServerError(_)));
    }
}
