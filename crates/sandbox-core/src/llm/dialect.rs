//! Wire-format encoding/decoding for the two provider dialects.
//! A tagged union over a closed set with an explicit unsupported branch,
//! in the same style as the package-manager dispatch in `dockerfile.rs`.

use crate::errors::LlmError;
use crate::llm::CompletionRequest;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s {
            "anthropic" => Some(Provider::Anthropic),
            "openai" => Some(Provider::OpenAi),
            _ => None,
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn body(self, model: &str, req: &CompletionRequest) -> Value {
        match self {
            Provider::Anthropic => {
                let mut body = json!({
                    "model": model,
                    "system": req.system,
                    "messages": [{"role": "user", "content": req.user}],
                    "max_tokens": req.max_tokens,
                });
                if let Some(t) = req.temperature {
                    body["temperature"] = json!(t);
                }
                body
            }
            Provider::OpenAi => {
                let mut body = json!({
                    "model": model,
                    "messages": [
                        {"role": "system", "content": req.system},
                        {"role": "user", "content": req.user},
                    ],
                    "max_tokens": req.max_tokens,
                });
                if let Some(t) = req.temperature {
                    body["temperature"] = json!(t);
                }
                body
            }
        }
    }

    /// Extract the completion text from a success response body.
    pub fn extract_text(self, body: &Value) -> Result<String, LlmError> {
        let text = match self {
            Provider::Anthropic => body
                .get("content")
                .and_then(|c| c.get(0))
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .and_then(|block| block.get("text"))
                .and_then(Value::as_str),
            Provider::OpenAi => body
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str),
        };

        text.map(str::to_string).ok_or_else(|| LlmError::UnexpectedResponse {
            preview: LlmError::preview(&body.to_string()),
        })
    }

    pub fn auth_headers(self, api_key: &str) -> Vec<(&'static str, String)> {
        match self {
            Provider::Anthropic => vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", "2023-06-01".to_string()),
            ],
            Provider::OpenAi => vec![("authorization", format!("Bearer {api_key}"))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_extracts_first_text_block() {
        let body = json!({"content": [{"type": "text", "text": "hello"}]});
        assert_eq!(Provider::Anthropic.extract_text(&body).unwrap(), "hello");
    }

    #[test]
    fn openai_extracts_first_choice_message() {
        let body = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(Provider::OpenAi.extract_text(&body).unwrap(), "hi");
    }

    #[test]
    fn unexpected_shape_is_an_error_with_preview() {
        let body = json!({"unexpected": true});
        let err = Provider::Anthropic.extract_text(&body).unwrap_err();
        assert!(matches!(err, LlmError::UnexpectedResponse { .. }));
    }
}
