use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use super::{Candidate, RawMatch};
use crate::config::GroupingConfig;
use crate::transcript::{text_for_range, Transcript, GROUNDING_BUFFER_SECS};

/// Merge overlapping or near-adjacent matches into candidates and score them.
///
/// Matches are sorted by start; a group keeps growing while the next start lies
/// less than `merge_gap_secs` after the latest end seen in the group.
pub fn group_matches(mut matches: Vec<RawMatch>, config: &GroupingConfig, transcript: &Transcript) -> Vec<Candidate> {
    if matches.is_empty() {
        return Vec::new();
    }

    matches.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut candidates = Vec::new();
    let mut group: Vec<RawMatch> = Vec::new();
    let mut group_end = f64::NEG_INFINITY;

    for m in matches {
        if !group.is_empty() && m.start_time - group_end >= config.merge_gap_secs {
            candidates.push(build_candidate(std::mem::take(&mut group), config, transcript));
            group_end = f64::NEG_INFINITY;
        }
        group_end = group_end.max(m.end_time);
        group.push(m);
    }
    if !group.is_empty() {
        candidates.push(build_candidate(group, config, transcript));
    }

    candidates
}

fn build_candidate(group: Vec<RawMatch>, config: &GroupingConfig, transcript: &Transcript) -> Candidate {
    let start_time = group.iter().map(|m| m.start_time).fold(f64::INFINITY, f64::min);
    let end_time = group.iter().map(|m| m.end_time).fold(f64::NEG_INFINITY, f64::max);

    // Earliest match wins ties.
    let best = group.iter()
        .fold(&group[0], |best, m| if m.score > best.score { m } else { best });

    let (start_time, end_time, transcript_text) =
        match text_for_range(transcript, start_time, end_time, GROUNDING_BUFFER_SECS) {
            Some(grounded) => (grounded.start, grounded.end, grounded.text),
            None => (start_time, end_time, best.transcript_text.clone()),
        };

    let distinct_patterns = group.iter().map(|m| m.pattern_id.as_str()).collect::<HashSet<_>>().len();
    let base: f64 = group.iter().map(|m| m.score).sum();
    let multiplier = bonus_multiplier(distinct_patterns, end_time - start_time, &transcript_text, config);

    if group.len() > 1 {
        debug!("Merged {} matches into {:.1}s-{:.1}s ({} patterns)", group.len(), start_time, end_time, distinct_patterns);
    }

    Candidate {
        id: Uuid::new_v4(),
        start_time,
        end_time,
        transcript_text,
        speaker: best.speaker.clone().or_else(|| group.iter().find_map(|m| m.speaker.clone())),
        total_score: (base * multiplier).max(0.0),
        primary_pattern: best.pattern_id.clone(),
        primary_pattern_name: best.pattern_name.clone(),
        quotable_line: best.quotable_line.clone(),
        why_selected: best.why_good.clone(),
        model_rating: None,
        rating_note: None,
        matched_patterns: group,
    }
}

/// Post-merge multipliers, each applied once. The two duration bonuses are
/// exclusive; the tighter band wins.
pub fn bonus_multiplier(distinct_patterns: usize, duration: f64, text: &str, config: &GroupingConfig) -> f64 {
    let mut multiplier = 1.0;

    if distinct_patterns >= 2 {
        multiplier *= config.multi_pattern_bonus;
    }

    if duration <= config.very_short_bonus_secs {
        multiplier *= config.very_short_bonus;
    } else if duration <= config.short_bonus_secs {
        multiplier *= config.short_bonus;
    }

    if text.chars().any(|c| c.is_ascii_digit()) {
        multiplier *= config.numeric_bonus;
    }

    multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::seg;

    fn transcript() -> Transcript {
        let segments = (0..60)
            .map(|i| seg(i as f64 * 10.0, (i + 1) as f64 * 10.0, &format!("sentence number {}", i)))
            .collect();
        Transcript::new("vid", segments)
    }

    fn m(pattern: &str, start: f64, end: f64, score: f64) -> RawMatch {
        RawMatch {
            pattern_id: pattern.to_string(),
            pattern_name: pattern.to_uppercase(),
            start_time: start,
            end_time: end,
            transcript_text: String::new(),
            speaker: None,
            trigger_phrase: String::new(),
            quotable_line: format!("quote for {}", pattern),
            why_good: format!("why {}", pattern),
            score,
        }
    }

    fn config() -> GroupingConfig {
        GroupingConfig::default()
    }

    #[test]
    fn test_near_matches_merge_into_union() {
        let candidates = group_matches(
            vec![m("hot_take", 115.0, 150.0, 1.3), m("bold_prediction", 100.0, 140.0, 1.4)],
            &config(), &transcript(),
        );
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!((c.start_time, c.end_time), (100.0, 150.0));
        assert_eq!(c.primary_pattern, "bold_prediction");
        assert_eq!(c.quotable_line, "quote for bold_prediction");
        assert_eq!(c.matched_patterns.len(), 2);
        assert!(c.transcript_text.starts_with("sentence number 10"));
        assert!(c.transcript_text.ends_with("sentence number 14"));
    }

    #[test]
    fn test_far_matches_stay_separate() {
        let candidates = group_matches(
            vec![m("hot_take", 100.0, 130.0, 1.3), m("contrast", 160.0, 190.0, 1.3)],
            &config(), &transcript(),
        );
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_group_extends_from_latest_end() {
        // Third match starts 20s after the first match's end but within 30s of the
        // longest member's end.
        let candidates = group_matches(
            vec![m("a", 0.0, 100.0, 1.0), m("b", 10.0, 30.0, 1.0), m("c", 120.0, 150.0, 1.0)],
            &config(), &transcript(),
        );
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_score_and_bonuses() {
        let cfg = config();
        // Two distinct patterns, 50s long, text has digits: 2.7 * 1.2 * 1.05
        let candidates = group_matches(
            vec![m("bold_prediction", 100.0, 140.0, 1.4), m("hot_take", 120.0, 150.0, 1.3)],
            &cfg, &transcript(),
        );
        let expected = 2.7 * 1.2 * 1.05;
        assert!((candidates[0].total_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_duration_bonuses_are_exclusive() {
        let cfg = config();
        assert!((bonus_multiplier(1, 30.0, "no digits", &cfg) - 1.2).abs() < 1e-9);
        assert!((bonus_multiplier(1, 45.0, "no digits", &cfg) - 1.1).abs() < 1e-9);
        assert!((bonus_multiplier(1, 46.0, "no digits", &cfg) - 1.0).abs() < 1e-9);
        assert!((bonus_multiplier(2, 60.0, "10x", &cfg) - 1.2 * 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_same_pattern_twice_is_not_multi_pattern() {
        let cfg = config();
        let candidates = group_matches(
            vec![m("hot_take", 300.0, 340.0, 1.3), m("hot_take", 310.0, 350.0, 1.3)],
            &cfg, &transcript(),
        );
        // 50s, digits present, one distinct pattern
        assert!((candidates[0].total_score - 2.6 * 1.05).abs() < 1e-9);
    }
}
