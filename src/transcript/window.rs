use serde::Serialize;
use tracing::warn;

use super::{format_segment_line, Transcript, TranscriptSegment};

/// A time-bounded slice of the transcript sized for one scan prompt.
#[derive(Debug, Clone, Serialize)]
pub struct Window {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Window {
    fn from_segments(start_time: f64, segments: Vec<TranscriptSegment>) -> Self {
        let end_time = segments.last().map(|s| s.end).unwrap_or(start_time);
        let text = segments.iter()
            .map(format_segment_line)
            .collect::<Vec<_>>()
            .join("\n");
        Window { start_time, end_time, text, segments }
    }
}

/// Split a transcript into overlapping windows of roughly `target_secs`.
///
/// A window closes when the next segment starts more than `target_secs` after the
/// window start. The next window is seeded with the trailing segments that start
/// within `overlap_secs` of that boundary segment, so a thought spanning the cut is
/// seen whole at least once. The final partial window is always emitted.
///
/// An overlap that is not shorter than the window is clamped to half the window
/// so that every window starts later than the one before it.
pub fn segment_into_windows(transcript: &Transcript, target_secs: f64, overlap_secs: f64) -> Vec<Window> {
    let segments = &transcript.segments;
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let overlap_secs = if overlap_secs < target_secs {
        overlap_secs.max(0.0)
    } else {
        warn!("Overlap {}s is not shorter than the {}s window, clamping to {}s",
            overlap_secs, target_secs, target_secs / 2.0);
        target_secs / 2.0
    };

    let mut windows = Vec::new();
    let mut window_start = first.start;
    let mut current: Vec<TranscriptSegment> = Vec::new();

    for segment in segments {
        if segment.start - window_start > target_secs && !current.is_empty() {
            windows.push(Window::from_segments(window_start, current.clone()));

            let overlap_start = segment.start - overlap_secs;
            current.retain(|s| s.start >= overlap_start);
            window_start = current.first().map(|s| s.start).unwrap_or(segment.start);
        }
        current.push(segment.clone());
    }

    if !current.is_empty() {
        windows.push(Window::from_segments(window_start, current));
    }

    windows
}
