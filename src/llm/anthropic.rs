use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::Completion;
use crate::error::CompletionError;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const JSON_SYSTEM_PROMPT: &str = "Respond with a single valid JSON object and nothing else. No prose, no code fences.";

// Anthropic API response structures
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unknown,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .timeout(std::time::Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl Completion for AnthropicClient {
    async fn complete(&self, prompt: &str, wants_json: bool) -> Result<String, CompletionError> {
        let mut request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "temperature": 0.7,
            "messages": [{"role": "user", "content": prompt}]
        });
        if wants_json {
            request_body["system"] = serde_json::Value::String(JSON_SYSTEM_PROMPT.to_string());
        }

        debug!("Anthropic request: {} prompt chars, json={}", prompt.len(), wants_json);

        let response = self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Http { status: status.as_u16(), body });
        }

        let api_response: AnthropicResponse = response.json().await?;

        let text: String = api_response.content.into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Unknown => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}
