use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::prompts::polish_prompt;
use super::Candidate;
use crate::config::PassConfig;
use crate::llm::{complete_with_timeout, Completion};

/// Longest polished quote accepted, in characters.
pub const MAX_POLISHED_CHARS: usize = 100;

/// Tighten every selected candidate's quotable line concurrently. A failed or
/// implausible rewrite keeps the original line.
pub async fn polish_quotes(
    candidates: Vec<Candidate>,
    completion: &dyn Completion,
    pass: &PassConfig,
) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let semaphore = Semaphore::new(pass.max_concurrency.max(1));
    let tasks = candidates.iter().map(|candidate| {
        let semaphore = &semaphore;
        async move {
            let _permit = semaphore.acquire().await.ok()?;
            polish_one(candidate, completion, pass).await
        }
    });
    let polished = join_all(tasks).await;

    candidates.into_iter()
        .zip(polished)
        .map(|(candidate, line)| match line {
            Some(quotable_line) => Candidate { quotable_line, ..candidate },
            None => candidate,
        })
        .collect()
}

async fn polish_one(candidate: &Candidate, completion: &dyn Completion, pass: &PassConfig) -> Option<String> {
    let prompt = polish_prompt(candidate);
    match complete_with_timeout(completion, &prompt, false, pass.timeout()).await {
        Ok(text) => {
            let cleaned = clean_quote(&text);
            if cleaned.is_some() {
                debug!("Polished quote for {:.1}s-{:.1}s", candidate.start_time, candidate.end_time);
            }
            cleaned
        }
        Err(e) => {
            warn!("Polish failed for {:.1}s-{:.1}s: {}", candidate.start_time, candidate.end_time, e);
            None
        }
    }
}

/// Strip whitespace and wrapping quotes; reject empty or overlong results.
pub fn clean_quote(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let len = cleaned.chars().count();
    (len > 0 && len <= MAX_POLISHED_CHARS).then(|| cleaned.to_string())
}
