//! Shared fixtures for engine integration tests: a scripted completion and
//! transcript builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use podclip_lib::config::EngineConfig;
use podclip_lib::error::CompletionError;
use podclip_lib::llm::Completion;
use podclip_lib::transcript::{Transcript, TranscriptSegment};

type Responder = dyn Fn(&str) -> Result<String, CompletionError> + Send + Sync;

/// In-memory completion that answers each prompt with a caller-supplied rule
/// and keeps every prompt it was sent.
pub struct ScriptedCompletion {
    respond: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(respond: impl Fn(&str) -> Result<String, CompletionError> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same text.
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, prompt: &str, _wants_json: bool) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

pub const NO_MATCHES: &str = r#"{"matches": []}"#;

pub fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
    TranscriptSegment { start, end, text: text.to_string() }
}

/// `count` back-to-back segments of `step` seconds starting at zero.
pub fn steady_transcript(count: usize, step: f64) -> Transcript {
    let segments = (0..count)
        .map(|i| {
            let start = i as f64 * step;
            seg(start, start + step, &format!("Point number {} is worth hearing.", i))
        })
        .collect();
    Transcript::new("steady", segments)
}

/// Defaults with all waiting switched off.
pub fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.discovery.retry_backoff_ms = 0;
    config.discovery.inter_window_delay_ms = 0;
    config
}

/// Build one match object as the model would write it.
pub fn match_json(pattern: &str, start: f64, end: f64, quotable: &str) -> String {
    serde_json::json!({
        "pattern": pattern,
        "start_time": start,
        "end_time": end,
        "transcript": "words the model made up",
        "speaker": "Guest",
        "trigger_phrase": "",
        "quotable_line": quotable,
        "why_good": format!("{} lands hard", pattern),
    })
    .to_string()
}

pub fn matches_json(items: &[String]) -> String {
    format!(r#"{{"matches": [{}]}}"#, items.join(","))
}
