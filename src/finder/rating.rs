use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::parser::parse_response;
use super::prompts::rating_prompt;
use super::Candidate;
use crate::config::PassConfig;
use crate::llm::{complete_with_timeout, Completion};

/// Rating assumed when the model call fails or returns nothing usable.
pub const NEUTRAL_RATING: f64 = 5.0;

const CRITERIA: [&str; 5] = ["hook", "opinion", "shareability", "clarity", "uniqueness"];

#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub score: f64,
    pub analysis: Option<String>,
}

impl Rating {
    fn neutral() -> Self {
        Rating { score: NEUTRAL_RATING, analysis: None }
    }
}

/// Rate every candidate concurrently and scale its score by `rating / 5`.
pub async fn rate_candidates(
    candidates: Vec<Candidate>,
    completion: &dyn Completion,
    pass: &PassConfig,
    channel: &str,
) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let semaphore = Semaphore::new(pass.max_concurrency.max(1));
    let tasks = candidates.iter().map(|candidate| {
        let semaphore = &semaphore;
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return Rating::neutral();
            };
            rate_one(candidate, completion, pass, channel).await
        }
    });
    let ratings = join_all(tasks).await;

    candidates.into_iter()
        .zip(ratings)
        .map(|(candidate, rating)| Candidate {
            total_score: candidate.total_score * rating.score / NEUTRAL_RATING,
            model_rating: Some(rating.score),
            rating_note: rating.analysis,
            ..candidate
        })
        .collect()
}

async fn rate_one(candidate: &Candidate, completion: &dyn Completion, pass: &PassConfig, channel: &str) -> Rating {
    let prompt = rating_prompt(candidate, channel);
    let text = match complete_with_timeout(completion, &prompt, true, pass.timeout()).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Rating failed for {:.1}s-{:.1}s: {}", candidate.start_time, candidate.end_time, e);
            return Rating::neutral();
        }
    };

    match parse_response(&text) {
        Ok(parsed) => {
            let rating = rating_from_value(&parsed.value);
            debug!("Rated {:.1}s-{:.1}s: {:.1}", candidate.start_time, candidate.end_time, rating.score);
            rating
        }
        Err(e) => {
            warn!("Unparseable rating for {:.1}s-{:.1}s: {}", candidate.start_time, candidate.end_time, e);
            Rating::neutral()
        }
    }
}

/// `score` if present, else the mean of whichever criteria were given.
/// Clamped to 1-10.
pub fn rating_from_value(value: &Value) -> Rating {
    let number = |v: &Value| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()));

    let score = value.get("score").and_then(number).or_else(|| {
        let given: Vec<f64> = CRITERIA.iter()
            .filter_map(|key| value.get(*key).and_then(number))
            .collect();
        (!given.is_empty()).then(|| given.iter().sum::<f64>() / given.len() as f64)
    });

    let analysis = value.get("analysis")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Rating {
        score: score.filter(|s| s.is_finite()).map(|s| s.clamp(1.0, 10.0)).unwrap_or(NEUTRAL_RATING),
        analysis,
    }
}
