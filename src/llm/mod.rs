mod anthropic;
mod ollama;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::{CompletionError, Error};

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;

const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// The opaque text-completion capability. No schema or correctness guarantee is
/// made about the returned text, even when `wants_json` is set.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, wants_json: bool) -> Result<String, CompletionError>;
}

/// Run one completion bounded by `timeout`. Elapsed time counts as a failure.
pub async fn complete_with_timeout(
    completion: &dyn Completion,
    prompt: &str,
    wants_json: bool,
    timeout: Duration,
) -> Result<String, CompletionError> {
    match tokio::time::timeout(timeout, completion.complete(prompt, wants_json)).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout(timeout)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionProvider {
    Anthropic,
    Ollama,
}

impl CompletionProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Some(CompletionProvider::Anthropic),
            "ollama" | "local" => Some(CompletionProvider::Ollama),
            _ => None,
        }
    }

    pub fn api_key_name(&self) -> Option<&'static str> {
        match self {
            CompletionProvider::Anthropic => Some(ANTHROPIC_KEY_ENV),
            CompletionProvider::Ollama => None,
        }
    }
}

/// Build the configured provider. API keys come from the environment only.
pub fn build_completion(config: &ProviderConfig) -> Result<Arc<dyn Completion>, Error> {
    let provider = CompletionProvider::from_str(&config.kind)
        .ok_or_else(|| Error::UnknownProvider(config.kind.clone()))?;

    let completion: Arc<dyn Completion> = match provider {
        CompletionProvider::Anthropic => {
            let api_key = std::env::var(ANTHROPIC_KEY_ENV)
                .ok()
                .map(|k| k.trim().trim_matches('"').to_string())
                .filter(|k| !k.is_empty())
                .ok_or(CompletionError::MissingApiKey(ANTHROPIC_KEY_ENV))?;
            Arc::new(AnthropicClient::new(api_key, config.model.clone(), config.base_url.clone())?)
        }
        CompletionProvider::Ollama => {
            Arc::new(OllamaClient::new(config.model.clone(), config.base_url.clone())?)
        }
    };

    tracing::info!("Completion provider: {:?}", provider);
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy;

    #[async_trait]
    impl Completion for Sleepy {
        async fn complete(&self, _prompt: &str, _wants_json: bool) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(CompletionProvider::from_str("Anthropic"), Some(CompletionProvider::Anthropic));
        assert_eq!(CompletionProvider::from_str("ollama"), Some(CompletionProvider::Ollama));
        assert_eq!(CompletionProvider::from_str("groq"), None);
        assert_eq!(CompletionProvider::Ollama.api_key_name(), None);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let config = ProviderConfig { kind: "groq".to_string(), model: None, base_url: None };
        assert!(matches!(build_completion(&config), Err(Error::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let result = complete_with_timeout(&Sleepy, "hi", false, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(CompletionError::Timeout(_))));
    }
}
