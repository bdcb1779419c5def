mod window;
mod grounding;

use serde::{Deserialize, Serialize};

pub use window::{segment_into_windows, Window};
pub use grounding::{ground_match, text_for_range, GroundedText, GROUNDING_BUFFER_SECS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Full transcript as handed over by the transcription collaborator.
/// Segments are ordered by `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(alias = "video_id")]
    pub source_id: String,
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub full_text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl Transcript {
    pub fn new(source_id: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments.iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            source_id: source_id.into(),
            segments,
            full_text,
            language: default_language(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn duration(&self) -> f64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => last.end - first.start,
            _ => 0.0,
        }
    }
}

/// Render one segment as a prompt line: `[12.3s] text`.
pub fn format_segment_line(segment: &TranscriptSegment) -> String {
    format!("[{:.1}s] {}", segment.start, segment.text.trim())
}

/// Render the whole transcript for single-pass discovery.
///
/// Segments starting before `intro_skip_secs` are left out (intro music, sponsor
/// reads). If that leaves nothing, everything is used. When the rendering is over
/// `max_chars`, the beginning (40%), middle (35-65%) and end (70-100%) are sampled
/// with elision markers in between, then hard-truncated.
pub fn render_for_single_pass(transcript: &Transcript, max_chars: usize, intro_skip_secs: f64) -> String {
    let mut lines: Vec<String> = transcript.segments.iter()
        .filter(|s| s.start >= intro_skip_secs)
        .map(|s| format!("[{:.0}s] {}", s.start, s.text.trim()))
        .collect();

    if lines.is_empty() {
        lines = transcript.segments.iter()
            .map(|s| format!("[{:.0}s] {}", s.start, s.text.trim()))
            .collect();
    }

    let full_text = lines.join("\n");
    if full_text.chars().count() <= max_chars {
        return full_text;
    }

    let n = lines.len();
    let begin_end = n * 40 / 100;
    let mid_start = n * 35 / 100;
    let mid_end = n * 65 / 100;
    let end_start = n * 70 / 100;

    let mut sampled: Vec<String> = Vec::new();
    sampled.extend_from_slice(&lines[..begin_end]);
    sampled.push("... [MIDDLE OF EPISODE] ...".to_string());
    sampled.extend_from_slice(&lines[mid_start..mid_end]);
    sampled.push("... [END OF EPISODE] ...".to_string());
    sampled.extend_from_slice(&lines[end_start..]);

    let result = sampled.join("\n");
    if result.chars().count() > max_chars {
        let truncated: String = result.chars().take(max_chars).collect();
        format!("{}\n... [TRUNCATED]", truncated)
    } else {
        result
    }
}

/// Format seconds as `m:ss.ss` for human-facing output.
pub fn format_time(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u64;
    let secs = seconds % 60.0;
    format!("{}:{:05.2}", mins, secs)
}

#[cfg(test)]
pub(crate) fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
    TranscriptSegment { start, end, text: text.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_full_text() {
        let t = Transcript::new("vid", vec![seg(0.0, 2.0, " hello "), seg(2.0, 4.0, "world")]);
        assert_eq!(t.full_text, "hello world");
        assert_eq!(t.language, "en");
        assert!((t.duration() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_pass_skips_intro() {
        let t = Transcript::new("vid", vec![
            seg(0.0, 10.0, "intro music"),
            seg(31.0, 40.0, "real content"),
        ]);
        let rendered = render_for_single_pass(&t, 10_000, 30.0);
        assert_eq!(rendered, "[31s] real content");
    }

    #[test]
    fn test_single_pass_falls_back_when_everything_is_intro() {
        let t = Transcript::new("vid", vec![seg(0.0, 10.0, "short clip")]);
        let rendered = render_for_single_pass(&t, 10_000, 30.0);
        assert_eq!(rendered, "[0s] short clip");
    }

    #[test]
    fn test_single_pass_samples_long_transcripts() {
        let segments: Vec<TranscriptSegment> = (0..200)
            .map(|i| seg(30.0 + i as f64 * 10.0, 40.0 + i as f64 * 10.0, "some words spoken here"))
            .collect();
        let t = Transcript::new("vid", segments);
        let rendered = render_for_single_pass(&t, 3_000, 30.0);
        assert!(rendered.contains("[MIDDLE OF EPISODE]"));
        assert!(rendered.chars().count() <= 3_000 + "\n... [TRUNCATED]".len());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(75.5), "1:15.50");
        assert_eq!(format_time(5.0), "0:05.00");
    }
}
