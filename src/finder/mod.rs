mod parser;
mod prompts;
mod generator;
mod filter;
mod scoring;
mod selection;
mod rating;
mod polish;
mod review;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{DiscoveryMode, EngineConfig, TierPolicy};
use crate::error::ConfigError;
use crate::llm::Completion;
use crate::patterns::PatternCatalog;
use crate::transcript::{ground_match, render_for_single_pass, segment_into_windows, Transcript};

pub use parser::{extract_payloads, parse_response, parse_timestamp, MatchPayload, ParsedResponse, RepairStrategy};
pub use prompts::{fallback_prompt, scan_prompt, single_pass_prompt, truncate_chars};
pub use generator::CandidateGenerator;
pub use filter::{FilterOutcome, HardFilter, Rejection};
pub use scoring::{bonus_multiplier, group_matches};
pub use selection::{apply_threshold, select_diverse, TierAssignment, TierDirectory};
pub use rating::{rate_candidates, rating_from_value, Rating, NEUTRAL_RATING};
pub use polish::{clean_quote, polish_quotes, MAX_POLISHED_CHARS};
pub use review::format_candidate_for_review;

/// A grounded match resolved against the pattern catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub pattern_id: String,
    pub pattern_name: String,
    pub start_time: f64,
    pub end_time: f64,
    pub transcript_text: String,
    pub speaker: Option<String>,
    pub trigger_phrase: String,
    pub quotable_line: String,
    pub why_good: String,
    /// The pattern's configured weight.
    pub score: f64,
}

/// One or more merged matches proposed as a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub start_time: f64,
    pub end_time: f64,
    pub transcript_text: String,
    pub speaker: Option<String>,
    pub matched_patterns: Vec<RawMatch>,
    pub total_score: f64,
    pub primary_pattern: String,
    pub primary_pattern_name: String,
    pub quotable_line: String,
    pub why_selected: String,
    #[serde(default)]
    pub model_rating: Option<f64>,
    #[serde(default)]
    pub rating_note: Option<String>,
}

impl Candidate {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSelection {
    pub tier: String,
    pub policy: TierPolicy,
    pub clips: Vec<Candidate>,
}

impl FinalSelection {
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,
    pub channel: String,
}

/// The clip selection engine. Holds only read-only configuration and the
/// completion capability; every call works on its own transcript.
pub struct ClipFinder {
    config: EngineConfig,
    catalog: Arc<PatternCatalog>,
    tiers: TierDirectory,
    completion: Arc<dyn Completion>,
}

impl ClipFinder {
    /// Fails if the configuration does not validate.
    pub fn new(config: EngineConfig, catalog: Arc<PatternCatalog>, completion: Arc<dyn Completion>) -> Result<Self, ConfigError> {
        config.validate()?;
        let tiers = TierDirectory::from_config(&config);
        Ok(Self { config, catalog, tiers, completion })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn tiers(&self) -> &TierDirectory {
        &self.tiers
    }

    /// Run the whole pipeline for one transcript. Never fails: every stage drops
    /// what it cannot use and the result may be empty.
    pub async fn find_clips(&self, transcript: &Transcript, title: &str, channel: &str) -> FinalSelection {
        let assignment = self.tiers.assign(channel);
        let policy = self.tiers.policy(&assignment.tier);
        info!("{} ({}): {}", channel, transcript.source_id, assignment.reason);

        let empty = || FinalSelection { tier: assignment.tier.clone(), policy, clips: Vec::new() };

        if transcript.is_empty() {
            info!("Transcript {} has no segments, nothing to do", transcript.source_id);
            return empty();
        }

        let meta = SourceMetadata { title: title.to_string(), channel: channel.to_string() };
        let mode = self.config.discovery.mode;

        let payloads = self.discover(transcript, &meta).await;
        info!("Discovery found {} raw candidates", payloads.len());

        let matches = self.resolve(payloads, transcript);
        info!("{} candidates grounded and resolved", matches.len());

        let filter = HardFilter::new(&self.config.filter, self.config.filter.duration_band(mode));
        let outcome = filter.apply(matches);
        info!("Hard filter kept {}, rejected {}", outcome.kept.len(), outcome.rejected.len());

        let mut candidates = group_matches(outcome.kept, &self.config.grouping, transcript);
        info!("Grouped into {} candidates", candidates.len());

        if self.config.rating.enabled && !candidates.is_empty() {
            candidates = rate_candidates(candidates, self.completion.as_ref(), &self.config.rating, channel).await;
        }

        candidates.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
        let candidates = apply_threshold(candidates, &policy);
        info!("{} candidates at or above tier {} threshold {:.2}",
            candidates.len(), assignment.tier, policy.min_score_threshold);

        if candidates.is_empty() {
            return empty();
        }

        let mut clips = select_diverse(&candidates, policy.max_clips_per_source, self.config.selection.min_gap_secs);
        info!("Selected {} of {} candidates (max {})", clips.len(), candidates.len(), policy.max_clips_per_source);

        if self.config.polish.enabled {
            clips = polish_quotes(clips, self.completion.as_ref(), &self.config.polish).await;
        }

        FinalSelection { tier: assignment.tier, policy, clips }
    }

    /// Candidate discovery: sequential windows in scan mode, one prompt over the
    /// rendered transcript in single-pass mode.
    async fn discover(&self, transcript: &Transcript, meta: &SourceMetadata) -> Vec<MatchPayload> {
        let discovery = &self.config.discovery;
        let band = self.config.filter.duration_band(discovery.mode);
        let generator = CandidateGenerator::new(self.completion.as_ref(), discovery);

        match discovery.mode {
            DiscoveryMode::Scan => {
                let windows = segment_into_windows(transcript, discovery.window_secs, discovery.overlap_secs);
                info!("Scanning {} windows", windows.len());

                let mut payloads = Vec::new();
                for (i, window) in windows.iter().enumerate() {
                    if i > 0 && discovery.inter_window_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(discovery.inter_window_delay_ms)).await;
                    }
                    let primary = scan_prompt(window, meta, &self.catalog, discovery.window_prompt_chars, band);
                    let fallback = fallback_prompt(&window.text, meta, discovery.fallback_prompt_chars);
                    let found = generator.generate(&primary, &fallback).await;
                    debug!("Window {} ({:.0}s-{:.0}s): {} candidates", i + 1, window.start_time, window.end_time, found.len());
                    payloads.extend(found);
                }
                payloads
            }
            DiscoveryMode::SinglePass => {
                let rendered = render_for_single_pass(transcript, discovery.single_pass_prompt_chars, discovery.intro_skip_secs);
                let primary = single_pass_prompt(&rendered, meta, &self.catalog, band, discovery.intro_skip_secs);
                let fallback = fallback_prompt(&rendered, meta, discovery.fallback_prompt_chars);
                generator.skipping_before(discovery.intro_skip_secs)
                    .generate(&primary, &fallback)
                    .await
            }
        }
    }

    /// Ground each payload against the transcript, then map its label to a
    /// catalog pattern. Anything ungrounded or unresolvable is dropped.
    fn resolve(&self, payloads: Vec<MatchPayload>, transcript: &Transcript) -> Vec<RawMatch> {
        payloads.into_iter()
            .filter_map(|payload| ground_match(payload, transcript))
            .filter_map(|payload| {
                let Some(pattern) = self.catalog.resolve(&payload.pattern_label, &payload.trigger_phrase, &payload.transcript_text) else {
                    debug!("Unresolvable pattern label '{}' at {:.1}s, dropping", payload.pattern_label, payload.start_time);
                    return None;
                };
                let trigger_phrase = pattern.trigger_in(&payload.trigger_phrase)
                    .or_else(|| pattern.trigger_in(&payload.transcript_text))
                    .map(str::to_string)
                    .unwrap_or(payload.trigger_phrase);
                Some(RawMatch {
                    pattern_id: pattern.id.clone(),
                    pattern_name: pattern.display_name.clone(),
                    start_time: payload.start_time,
                    end_time: payload.end_time,
                    transcript_text: payload.transcript_text,
                    speaker: payload.speaker,
                    trigger_phrase,
                    quotable_line: payload.quotable_line,
                    why_good: payload.why_good,
                    score: pattern.weight,
                })
            })
            .collect()
    }
}
