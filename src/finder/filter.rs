use thiserror::Error;
use tracing::debug;

use super::RawMatch;
use crate::config::{DurationBand, FilterConfig};

/// Why a match was rejected by rule. Only recorded for logs; never an error
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("bad opener: starts with '{0}'")]
    BadOpener(String),

    #[error("too much jargon: {0} technical terms")]
    TooMuchJargon(usize),

    #[error("incomplete thought: trails off")]
    TrailsOff,

    #[error("no quotable line found")]
    NoQuotableLine,

    #[error("duration {duration:.1}s outside {min:.0}s-{max:.0}s")]
    Duration { duration: f64, min: f64, max: f64 },
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<RawMatch>,
    pub rejected: Vec<(RawMatch, Rejection)>,
}

/// Deterministic rule-based rejection. A pure function of the match and the
/// configured rules, so applying it twice keeps the same set.
#[derive(Debug, Clone)]
pub struct HardFilter {
    bad_openers: Vec<String>,
    jargon_terms: Vec<String>,
    jargon_threshold: usize,
    jargon_window_words: usize,
    min_quotable_chars: usize,
    band: DurationBand,
}

impl HardFilter {
    pub fn new(config: &FilterConfig, band: DurationBand) -> Self {
        Self {
            bad_openers: config.bad_openers.iter().map(|s| s.to_lowercase()).collect(),
            jargon_terms: config.jargon_terms.iter().map(|s| s.to_lowercase()).collect(),
            jargon_threshold: config.jargon_threshold,
            jargon_window_words: config.jargon_window_words,
            min_quotable_chars: config.min_quotable_chars,
            band,
        }
    }

    /// First rule the match breaks, if any.
    pub fn check(&self, m: &RawMatch) -> Result<(), Rejection> {
        let text = m.transcript_text.trim();
        let lowered = text.to_lowercase();

        if let Some(opener) = self.bad_openers.iter().find(|o| lowered.starts_with(o.as_str())) {
            return Err(Rejection::BadOpener(opener.trim().to_string()));
        }

        if self.jargon_threshold > 0 {
            let head = lowered.split_whitespace()
                .take(self.jargon_window_words)
                .collect::<Vec<_>>()
                .join(" ");
            let jargon = self.jargon_terms.iter().filter(|j| head.contains(j.as_str())).count();
            if jargon >= self.jargon_threshold {
                return Err(Rejection::TooMuchJargon(jargon));
            }
        }

        if text.ends_with("...") || text.ends_with('…') {
            return Err(Rejection::TrailsOff);
        }

        if m.quotable_line.trim().chars().count() < self.min_quotable_chars {
            return Err(Rejection::NoQuotableLine);
        }

        let duration = m.end_time - m.start_time;
        if !self.band.contains(duration) {
            return Err(Rejection::Duration {
                duration,
                min: self.band.min_secs,
                max: self.band.max_secs,
            });
        }

        Ok(())
    }

    pub fn apply(&self, matches: Vec<RawMatch>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for m in matches {
            match self.check(&m) {
                Ok(()) => outcome.kept.push(m),
                Err(reason) => {
                    debug!("Rejected {:.1}s-{:.1}s ({}): {}", m.start_time, m.end_time, m.pattern_id, reason);
                    outcome.rejected.push((m, reason));
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryMode;

    fn filter() -> HardFilter {
        let config = FilterConfig::default();
        HardFilter::new(&config, config.duration_band(DiscoveryMode::Scan))
    }

    fn m(start: f64, end: f64, text: &str, quotable: &str) -> RawMatch {
        RawMatch {
            pattern_id: "hot_take".to_string(),
            pattern_name: "Hot Take/Death Declaration".to_string(),
            start_time: start,
            end_time: end,
            transcript_text: text.to_string(),
            speaker: None,
            trigger_phrase: "is dead".to_string(),
            quotable_line: quotable.to_string(),
            why_good: "bold".to_string(),
            score: 1.3,
        }
    }

    const QUOTE: &str = "the old playbook is dead and buried";

    #[test]
    fn test_clean_match_passes() {
        assert_eq!(filter().check(&m(0.0, 30.0, "The old playbook is dead.", QUOTE)), Ok(()));
    }

    #[test]
    fn test_bad_opener() {
        let err = filter().check(&m(0.0, 30.0, "  So the old playbook is dead.", QUOTE)).unwrap_err();
        assert_eq!(err, Rejection::BadOpener("so".to_string()));
        // "Sorry" is not "so "
        assert!(filter().check(&m(0.0, 30.0, "Sorry, the old playbook is dead.", QUOTE)).is_ok());
    }

    #[test]
    fn test_jargon_density() {
        let text = "The yield curve and term structure shift impermanent loss for everyone.";
        assert_eq!(filter().check(&m(0.0, 30.0, text, QUOTE)), Err(Rejection::TooMuchJargon(3)));
        let two = "The yield curve and term structure matter.";
        assert!(filter().check(&m(0.0, 30.0, two, QUOTE)).is_ok());
    }

    #[test]
    fn test_trailing_off() {
        assert_eq!(filter().check(&m(0.0, 30.0, "And then we...", QUOTE)).unwrap_err().to_string(),
            "bad opener: starts with 'and'");
        assert_eq!(filter().check(&m(0.0, 30.0, "Then we…", QUOTE)), Err(Rejection::TrailsOff));
    }

    #[test]
    fn test_short_quotable_line() {
        let err = filter().check(&m(0.0, 30.0, "The old playbook is dead.", "0123456789")).unwrap_err();
        assert_eq!(err.to_string(), "no quotable line found");
    }

    #[test]
    fn test_duration_boundaries_are_inclusive() {
        let f = filter();
        assert!(f.check(&m(100.0, 115.0, "Clean text.", QUOTE)).is_ok());
        assert!(f.check(&m(100.0, 190.0, "Clean text.", QUOTE)).is_ok());
        assert!(matches!(f.check(&m(100.0, 114.0, "Clean text.", QUOTE)), Err(Rejection::Duration { .. })));
        assert!(matches!(f.check(&m(100.0, 191.0, "Clean text.", QUOTE)), Err(Rejection::Duration { .. })));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let f = filter();
        let input = vec![
            m(0.0, 30.0, "The old playbook is dead.", QUOTE),
            m(40.0, 70.0, "But nobody listens.", QUOTE),
            m(80.0, 85.0, "Too short.", QUOTE),
            m(100.0, 130.0, "Numbers matter: 40 percent.", QUOTE),
        ];
        let once = f.apply(input);
        assert_eq!(once.kept.len(), 2);
        assert_eq!(once.rejected.len(), 2);
        let twice = f.apply(once.kept.clone());
        assert_eq!(twice.kept, once.kept);
        assert!(twice.rejected.is_empty());
    }
}
