use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Completion;
use crate::error::CompletionError;

const DEFAULT_MODEL: &str = "llama3.1:8b";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Local Ollama server (`/api/chat`). No API key, no rate limit.
pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaClient {
    pub fn new(model: Option<String>, base_url: Option<String>) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl Completion for OllamaClient {
    async fn complete(&self, prompt: &str, wants_json: bool) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            stream: false,
            format: wants_json.then_some("json"),
        };

        debug!("Ollama request ({}): {} prompt chars, json={}", self.model, prompt.len(), wants_json);

        let response = self.client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Http { status: status.as_u16(), body });
        }

        let chat: ChatResponse = response.json().await?;
        if chat.message.content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(chat.message.content)
    }
}
