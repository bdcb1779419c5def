//! Prompt templates for discovery, rating and polishing.

use super::{Candidate, SourceMetadata};
use crate::config::DurationBand;
use crate::patterns::PatternCatalog;
use crate::transcript::Window;

/// Truncate to at most `max_chars` characters (UTF-8 safe).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

const CLIP_RULES: &str = r#"CRITICAL: The clip must:
- Start CLEAN (not with "But", "So", "And", "What we", "I mean")
- Be a COMPLETE thought (not trail off)
- Be QUOTABLE (something you'd screenshot)
- Take a STANCE (not just describe)"#;

const MATCH_SCHEMA: &str = r#"Return JSON:
{
    "matches": [
        {
            "pattern": "<pattern name from list above>",
            "start_time": <exact timestamp from the [XXXs] markers>,
            "end_time": <timestamp where the thought completes>,
            "transcript": "<exact verbatim text>",
            "speaker": "<name if mentioned>",
            "trigger_phrase": "<which phrase triggered the match>",
            "quotable_line": "<the single most tweetable line, 10-20 words>",
            "why_good": "<1 sentence: why this would work on social media>"
        }
    ]
}"#;

/// Primary prompt for one scan window.
pub fn scan_prompt(
    window: &Window,
    meta: &SourceMetadata,
    catalog: &PatternCatalog,
    max_chars: usize,
    band: DurationBand,
) -> String {
    format!(
        r#"You are hunting for VIRAL CLIP MOMENTS in a podcast.

PODCAST: {channel} - "{title}"
CHUNK: {start:.0}s - {end:.0}s

TRANSCRIPT:
{text}

PATTERNS THAT GO VIRAL (find these):
{patterns}

{rules}
- Last between {min:.0} and {max:.0} seconds
- ONLY use timestamps that appear in the transcript above

{schema}

If no good matches in this chunk, return: {{"matches": []}}
Quality over quantity - only return genuinely good moments."#,
        channel = meta.channel,
        title = meta.title,
        start = window.start_time,
        end = window.end_time,
        text = truncate_chars(&window.text, max_chars),
        patterns = catalog.describe(),
        rules = CLIP_RULES,
        min = band.min_secs,
        max = band.max_secs,
        schema = MATCH_SCHEMA,
    )
}

/// Primary prompt for single-pass discovery over the whole rendered transcript.
pub fn single_pass_prompt(
    rendered: &str,
    meta: &SourceMetadata,
    catalog: &PatternCatalog,
    band: DurationBand,
    intro_skip_secs: f64,
) -> String {
    format!(
        r#"Find the BEST viral clip moments from this podcast.

PODCAST: {channel} - "{title}"

TRANSCRIPT (with timestamps):
{rendered}

WINNING PATTERNS (look for these):
{patterns}

{rules}
- Last between {min:.0} and {max:.0} seconds

MUST AVOID:
- Sponsor reads or ads
- Subscribe/like reminders

TIMESTAMP RULES:
- ONLY use timestamps that appear in the transcript above (look for [XXXs])
- start_time MUST be >= {intro:.0} (skip the intro)
- A timestamp that does not exist in the transcript gets the clip REJECTED

{schema}

Return 2-3 matches. Every podcast has quotable moments, always return something."#,
        channel = meta.channel,
        title = meta.title,
        patterns = catalog.describe(),
        rules = CLIP_RULES,
        min = band.min_secs,
        max = band.max_secs,
        intro = intro_skip_secs,
        schema = MATCH_SCHEMA,
    )
}

/// Simplified retry prompt: a concrete example instead of a schema.
pub fn fallback_prompt(text: &str, meta: &SourceMetadata, max_chars: usize) -> String {
    format!(
        r#"Find 2 interesting quotes from this podcast.

PODCAST: {channel} - "{title}"

TRANSCRIPT:
{text}

Only use timestamps from the [XXXs] markers above.

Return JSON with this exact format:
{{"matches": [
    {{"start_time": 100, "end_time": 130, "transcript": "the quote text", "quotable_line": "short catchy version", "pattern": "BOLD PREDICTION", "why_good": "interesting take", "speaker": "Guest"}},
    {{"start_time": 500, "end_time": 540, "transcript": "another quote", "quotable_line": "short version", "pattern": "HOT TAKE", "why_good": "controversial", "speaker": "Host"}}
]}}

Pick any interesting moments. If there are none, return {{"matches": []}}."#,
        channel = meta.channel,
        title = meta.title,
        text = truncate_chars(text, max_chars),
    )
}

pub fn rating_prompt(candidate: &Candidate, channel: &str) -> String {
    format!(
        r#"Rate this podcast clip for viral potential on social media.

CHANNEL: {channel}
CLIP: "{clip}"
QUOTABLE: "{quote}"

Score 1-10 on each criterion:
1. HOOK: Does it grab attention immediately?
2. OPINION: Does it take a strong stance?
3. SHAREABILITY: Would people quote-post this?
4. CLARITY: Is the point clear in 60 seconds?
5. UNIQUENESS: Is this a fresh take?

Return JSON:
{{
    "hook": <1-10>,
    "opinion": <1-10>,
    "shareability": <1-10>,
    "clarity": <1-10>,
    "uniqueness": <1-10>,
    "score": <average>,
    "analysis": "<one sentence on viral potential>"
}}"#,
        channel = channel,
        clip = truncate_chars(&candidate.transcript_text, 500),
        quote = candidate.quotable_line,
    )
}

pub fn polish_prompt(candidate: &Candidate) -> String {
    format!(
        r#"Improve this quotable line for social media.

ORIGINAL: "{quote}"
CONTEXT: {context}

Make it:
- Punchy and memorable
- 10-20 words max
- Standalone (makes sense without context)
- Lowercase (except proper nouns)

Return ONLY the improved quote, nothing else."#,
        quote = candidate.quotable_line,
        context = truncate_chars(&candidate.transcript_text, 300),
    )
}
