use std::collections::HashMap;

use tracing::debug;

use super::Candidate;
use crate::config::{ChannelEntry, EngineConfig, TierPolicy, DEFAULT_TIER};

/// Scores closer than this count as a tie for the pattern-variety preference.
const SCORE_TIE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct TierAssignment {
    pub tier: String,
    pub notes: Option<String>,
    pub reason: String,
}

/// Channel → tier lookup plus the per-tier policies. Built once from config.
#[derive(Debug, Clone, Default)]
pub struct TierDirectory {
    channels: Vec<ChannelEntry>,
    /// Lowercased names and '@'-stripped handles, in config order.
    keys: Vec<(String, String)>,
    policies: HashMap<String, TierPolicy>,
}

impl TierDirectory {
    pub fn new(channels: &[ChannelEntry], policies: &HashMap<String, TierPolicy>) -> Self {
        let mut keys = Vec::new();
        for ch in channels {
            keys.push((ch.name.trim().to_lowercase(), ch.tier.clone()));
            if let Some(handle) = &ch.handle {
                let handle = handle.trim().trim_start_matches('@').to_lowercase();
                if !handle.is_empty() {
                    keys.push((handle, ch.tier.clone()));
                }
            }
        }
        Self {
            channels: channels.to_vec(),
            keys,
            policies: policies.clone(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.channels, &config.tiers)
    }

    /// Exact name/handle match first, then substring either way, else "B".
    pub fn tier_for(&self, channel: &str) -> &str {
        let wanted = channel.trim().trim_start_matches('@').to_lowercase();
        if wanted.is_empty() {
            return DEFAULT_TIER;
        }

        if let Some((_, tier)) = self.keys.iter().find(|(key, _)| *key == wanted) {
            return tier;
        }

        self.keys.iter()
            .find(|(key, _)| !key.is_empty() && (key.contains(&wanted) || wanted.contains(key.as_str())))
            .map(|(_, tier)| tier.as_str())
            .unwrap_or(DEFAULT_TIER)
    }

    /// Notes for an exactly matching channel name or handle.
    pub fn notes_for(&self, channel: &str) -> Option<&str> {
        let wanted = channel.trim().to_lowercase();
        let wanted_handle = wanted.trim_start_matches('@');
        self.channels.iter()
            .find(|ch| {
                ch.name.trim().to_lowercase() == wanted
                    || ch.handle.as_deref()
                        .map(|h| h.trim().trim_start_matches('@').to_lowercase() == wanted_handle)
                        .unwrap_or(false)
            })
            .and_then(|ch| ch.notes.as_deref())
    }

    /// Configured policy for `tier`, then the built-in one, then tier B's.
    pub fn policy(&self, tier: &str) -> TierPolicy {
        self.policies.get(tier)
            .copied()
            .or_else(|| TierPolicy::builtin(tier))
            .or_else(|| self.policies.get(DEFAULT_TIER).copied())
            .unwrap_or_default()
    }

    pub fn assign(&self, channel: &str) -> TierAssignment {
        let tier = self.tier_for(channel).to_string();
        let reason = match tier.as_str() {
            "A" => "Tier A: high-priority channel for clip mining".to_string(),
            "B" => "Tier B: standard processing".to_string(),
            "C" => "Tier C: technical content, only exceptional clips will pass".to_string(),
            other => format!("Tier {}: custom policy", other),
        };
        TierAssignment {
            notes: self.notes_for(channel).map(str::to_string),
            tier,
            reason,
        }
    }
}

/// Drop candidates scoring below the tier's floor. A zero floor keeps everything.
pub fn apply_threshold(candidates: Vec<Candidate>, policy: &TierPolicy) -> Vec<Candidate> {
    if policy.min_score_threshold <= 0.0 {
        return candidates;
    }
    candidates.into_iter()
        .filter(|c| {
            let keep = c.total_score >= policy.min_score_threshold;
            if !keep {
                debug!("Below tier threshold {:.2}: {:.1}s-{:.1}s scored {:.2}",
                    policy.min_score_threshold, c.start_time, c.end_time, c.total_score);
            }
            keep
        })
        .collect()
}

/// Greedy, score-ordered pick of at most `max_clips` candidates whose starts are
/// pairwise at least `min_gap_secs` apart.
///
/// Among the best eligible candidates tied on score, one whose primary pattern is
/// not selected yet is preferred; otherwise score order (stable) decides. A
/// repeated pattern still fills a free slot.
pub fn select_diverse(candidates: &[Candidate], max_clips: usize, min_gap_secs: f64) -> Vec<Candidate> {
    let mut pool: Vec<&Candidate> = candidates.iter().collect();
    pool.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

    let mut selected: Vec<&Candidate> = Vec::new();
    while selected.len() < max_clips {
        let eligible: Vec<usize> = (0..pool.len())
            .filter(|&i| !selected.iter().any(|s| (s.start_time - pool[i].start_time).abs() < min_gap_secs))
            .collect();

        let Some(&first) = eligible.first() else {
            break;
        };
        let top_score = pool[first].total_score;

        let chosen = eligible.iter()
            .copied()
            .take_while(|&i| top_score - pool[i].total_score <= SCORE_TIE_EPSILON)
            .find(|&i| !selected.iter().any(|s| s.primary_pattern == pool[i].primary_pattern))
            .unwrap_or(first);

        selected.push(pool.remove(chosen));
    }

    selected.into_iter().cloned().collect()
}
