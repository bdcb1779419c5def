use std::time::Duration;

use tracing::{debug, warn};

use super::parser::{extract_payloads, parse_response, MatchPayload};
use crate::config::DiscoveryConfig;
use crate::error::GenerateError;
use crate::llm::{complete_with_timeout, Completion};

/// Asks the model for candidates: the primary prompt first, then the simplified
/// fallback for the remaining attempts. Never fails; running out of attempts
/// yields an empty result.
pub struct CandidateGenerator<'a> {
    completion: &'a dyn Completion,
    discovery: &'a DiscoveryConfig,
    min_start_secs: f64,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(completion: &'a dyn Completion, discovery: &'a DiscoveryConfig) -> Self {
        Self { completion, discovery, min_start_secs: 0.0 }
    }

    /// Discard candidates starting before `secs`. An attempt whose candidates
    /// all fall before it counts as empty.
    pub fn skipping_before(mut self, secs: f64) -> Self {
        self.min_start_secs = secs;
        self
    }

    pub async fn generate(&self, primary: &str, fallback: &str) -> Vec<MatchPayload> {
        let attempts = self.discovery.max_attempts.max(1);

        for attempt in 0..attempts {
            let (label, prompt) = if attempt == 0 {
                ("primary", primary)
            } else {
                ("fallback", fallback)
            };

            match self.attempt(prompt).await {
                Ok(payloads) if !payloads.is_empty() => {
                    debug!("{} prompt yielded {} candidates", label, payloads.len());
                    return payloads;
                }
                Ok(_) => warn!("{} prompt yielded no candidates (attempt {}/{})", label, attempt + 1, attempts),
                Err(e) => warn!("{} prompt failed (attempt {}/{}): {}", label, attempt + 1, attempts, e),
            }

            if attempt + 1 < attempts && self.discovery.retry_backoff_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.discovery.retry_backoff_ms)).await;
            }
        }

        Vec::new()
    }

    /// One bounded completion call followed by parsing.
    pub async fn attempt(&self, prompt: &str) -> Result<Vec<MatchPayload>, GenerateError> {
        let text = complete_with_timeout(self.completion, prompt, true, self.discovery.timeout()).await?;
        let parsed = parse_response(&text)?;
        debug!("Parsed response via {:?}", parsed.strategy);
        let payloads = extract_payloads(&parsed.value, self.discovery.default_clip_secs)
            .into_iter()
            .filter(|p| {
                let keep = p.start_time >= self.min_start_secs;
                if !keep {
                    debug!("Skipping match at {:.1}s, before {:.1}s", p.start_time, self.min_start_secs);
                }
                keep
            })
            .collect();
        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::CompletionError;

    /// Replays canned responses in order and records the prompts it saw.
    struct Scripted {
        responses: Mutex<Vec<Result<String, CompletionError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
            Self { responses: Mutex::new(responses), prompts: Mutex::new(Vec::new()) }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Completion for Scripted {
        async fn complete(&self, prompt: &str, _wants_json: bool) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(CompletionError::EmptyResponse);
            }
            responses.remove(0)
        }
    }

    fn discovery() -> DiscoveryConfig {
        DiscoveryConfig { retry_backoff_ms: 0, ..DiscoveryConfig::default() }
    }

    const ONE_MATCH: &str = r#"{"matches": [{"pattern": "Hot Take", "start_time": 60, "end_time": 90, "transcript": "x"}]}"#;

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let completion = Scripted::new(vec![Ok(ONE_MATCH.to_string())]);
        let config = discovery();
        let generator = CandidateGenerator::new(&completion, &config);
        let payloads = generator.generate("PRIMARY", "FALLBACK").await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(completion.prompts(), vec!["PRIMARY".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_primary_falls_back() {
        let completion = Scripted::new(vec![Ok(r#"{"matches": []}"#.to_string()), Ok(ONE_MATCH.to_string())]);
        let config = discovery();
        let generator = CandidateGenerator::new(&completion, &config);
        let payloads = generator.generate("PRIMARY", "FALLBACK").await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(completion.prompts(), vec!["PRIMARY".to_string(), "FALLBACK".to_string()]);
    }

    #[tokio::test]
    async fn test_unparseable_primary_falls_back() {
        let completion = Scripted::new(vec![Ok("I could not find anything".to_string()), Ok(ONE_MATCH.to_string())]);
        let config = discovery();
        let generator = CandidateGenerator::new(&completion, &config);
        assert_eq!(generator.generate("PRIMARY", "FALLBACK").await.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_are_empty() {
        let completion = Scripted::new(vec![
            Err(CompletionError::Transport("connection refused".to_string())),
            Err(CompletionError::Timeout(Duration::from_secs(1))),
            Ok(ONE_MATCH.to_string()),
        ]);
        let config = discovery();
        let generator = CandidateGenerator::new(&completion, &config);
        assert!(generator.generate("PRIMARY", "FALLBACK").await.is_empty());
        assert_eq!(completion.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_skipped_primary_falls_back() {
        let intro_only = r#"{"matches": [{"pattern": "Hot Take", "start_time": 5, "end_time": 35, "transcript": "x"}]}"#;
        let completion = Scripted::new(vec![Ok(intro_only.to_string()), Ok(ONE_MATCH.to_string())]);
        let config = discovery();
        let generator = CandidateGenerator::new(&completion, &config).skipping_before(30.0);
        let payloads = generator.generate("PRIMARY", "FALLBACK").await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].start_time, 60.0);
        assert_eq!(completion.prompts(), vec!["PRIMARY".to_string(), "FALLBACK".to_string()]);
    }

    #[tokio::test]
    async fn test_attempt_surfaces_parse_error() {
        let completion = Scripted::new(vec![Ok("nothing".to_string())]);
        let config = discovery();
        let generator = CandidateGenerator::new(&completion, &config);
        assert!(matches!(generator.attempt("p").await, Err(GenerateError::Parse(_))));
    }
}
