use tracing::debug;

use super::Transcript;
use crate::finder::MatchPayload;

/// Widening applied when a claimed range touches no segment at all.
pub const GROUNDING_BUFFER_SECS: f64 = 5.0;

/// Verbatim transcript text recovered for a time range.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedText {
    pub text: String,
    /// Range actually covered. Equals the requested range unless the buffer retry
    /// was needed, in which case it is snapped to the matched segments.
    pub start: f64,
    pub end: f64,
    pub used_buffer: bool,
}

/// Concatenate, in timestamp order, the text of every segment overlapping
/// `[start, end]`. If nothing overlaps, retry once with the range widened by
/// `buffer_secs` on both sides. Returns `None` when the range is ungrounded.
pub fn text_for_range(transcript: &Transcript, start: f64, end: f64, buffer_secs: f64) -> Option<GroundedText> {
    let overlapping = |lo: f64, hi: f64| {
        transcript.segments.iter()
            .filter(move |seg| seg.start < hi && seg.end > lo)
    };

    let direct: Vec<&str> = overlapping(start, end).map(|s| s.text.trim()).collect();
    if !direct.is_empty() {
        return Some(GroundedText {
            text: join_texts(&direct),
            start,
            end,
            used_buffer: false,
        });
    }

    let widened: Vec<_> = overlapping(start - buffer_secs, end + buffer_secs).collect();
    if widened.is_empty() {
        return None;
    }

    let snapped_start = widened.iter().map(|s| s.start).fold(f64::INFINITY, f64::min);
    let snapped_end = widened.iter().map(|s| s.end).fold(f64::NEG_INFINITY, f64::max);
    let texts: Vec<&str> = widened.iter().map(|s| s.text.trim()).collect();

    Some(GroundedText {
        text: join_texts(&texts),
        start: snapped_start,
        end: snapped_end,
        used_buffer: true,
    })
}

fn join_texts(texts: &[&str]) -> String {
    texts.iter()
        .filter(|t| !t.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace the model's self-reported quote with verbatim transcript text.
///
/// The model's `transcript_text` is discarded unconditionally. Matches whose range
/// is inverted, or which touch no segment even after the buffer retry, are dropped.
pub fn ground_match(raw: MatchPayload, transcript: &Transcript) -> Option<MatchPayload> {
    if !(raw.end_time > raw.start_time) {
        debug!("Dropping match with inverted range {:.1}s-{:.1}s", raw.start_time, raw.end_time);
        return None;
    }

    let Some(grounded) = text_for_range(transcript, raw.start_time, raw.end_time, GROUNDING_BUFFER_SECS) else {
        debug!("Ungrounded match {:.1}s-{:.1}s ({}), dropping", raw.start_time, raw.end_time, raw.pattern_label);
        return None;
    };

    if grounded.text.is_empty() || !(grounded.end > grounded.start) {
        return None;
    }

    if grounded.used_buffer {
        debug!("Grounded {:.1}s-{:.1}s via buffer, snapped to {:.1}s-{:.1}s",
            raw.start_time, raw.end_time, grounded.start, grounded.end);
    }

    Some(MatchPayload {
        start_time: grounded.start,
        end_time: grounded.end,
        transcript_text: grounded.text,
        ..raw
    })
}
