//! Layered parsing of model responses.
//!
//! Each strategy runs only when the previous one failed: strict parse, balanced-brace slice (closing an
//! unterminated object if needed), textual repair, then regex salvage of
//! individual clip objects.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ParseError;
use crate::patterns::EXTRACTED_PATTERN_ID;

static CLIP_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\{\s*"start_time"\s*:\s*"?(\d+(?:\.\d+)?)s?"?\s*,\s*"end_time"\s*:\s*"?(\d+(?:\.\d+)?)s?"?\s*,\s*"transcript(?:_text)?"\s*:\s*"((?:[^"\\]|\\.)*)""#,
    )
    .expect("clip object regex is valid")
});

const EXTRACTED_QUOTE_CHARS: usize = 100;
const LIST_KEYS: [&str; 3] = ["matches", "clips", "candidates"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    Direct,
    BalancedSlice,
    TextualRepair,
    RegexExtraction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub value: Value,
    pub strategy: RepairStrategy,
}

/// One candidate as the model described it, before grounding and pattern
/// resolution. Nothing here is trusted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPayload {
    pub pattern_label: String,
    pub start_time: f64,
    pub end_time: f64,
    pub transcript_text: String,
    pub speaker: Option<String>,
    pub trigger_phrase: String,
    pub quotable_line: String,
    pub why_good: String,
}

pub fn parse_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    let content = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return Ok(ParsedResponse { value, strategy: RepairStrategy::Direct });
    }

    let Some(start_idx) = content.find(['{', '[']) else {
        return Err(ParseError::NoJson);
    };

    let sliced = balanced_slice(&content[start_idx..]);
    if let Ok(value) = serde_json::from_str::<Value>(&sliced) {
        return Ok(ParsedResponse { value, strategy: RepairStrategy::BalancedSlice });
    }

    let fixed = repair_text(&sliced);
    if let Ok(value) = serde_json::from_str::<Value>(&fixed) {
        return Ok(ParsedResponse { value, strategy: RepairStrategy::TextualRepair });
    }

    let extracted = extract_clip_objects(content);
    if !extracted.is_empty() {
        debug!("Extracted {} clips from malformed response via regex", extracted.len());
        return Ok(ParsedResponse {
            value: json!({ "matches": extracted }),
            strategy: RepairStrategy::RegexExtraction,
        });
    }

    Err(ParseError::Unrecoverable)
}

/// Slice from the opening brace or bracket to its matching close. If the text ends first,
/// append whatever closers the open brackets still need.
fn balanced_slice(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
                if stack.is_empty() {
                    return text[..i + ch.len_utf8()].to_string();
                }
            }
            _ => {}
        }
    }

    let mut closed = text.trim_end().to_string();
    if in_string {
        closed.push('"');
    }
    while let Some(closer) = stack.pop() {
        closed.push(closer);
    }
    closed
}

/// Drop trailing commas and flatten raw line breaks and tabs. String contents
/// are left alone apart from the line breaks.
fn repair_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut repaired = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else {
            match ch {
                '"' => in_string = true,
                ',' if closes_next(&chars[i + 1..]) => continue,
                _ => {}
            }
        }
        repaired.push(if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch });
    }

    repaired
}

fn closes_next(rest: &[char]) -> bool {
    rest.iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| matches!(c, '}' | ']'))
}

fn extract_clip_objects(text: &str) -> Vec<Value> {
    CLIP_OBJECT.captures_iter(text)
        .filter_map(|caps| {
            let start: f64 = caps[1].parse().ok()?;
            let end: f64 = caps[2].parse().ok()?;
            let transcript = caps[3].replace("\\\"", "\"").replace("\\n", " ");
            let quotable: String = transcript.chars().take(EXTRACTED_QUOTE_CHARS).collect();
            Some(json!({
                "start_time": start,
                "end_time": end,
                "transcript": transcript,
                "quotable_line": quotable,
                "pattern": EXTRACTED_PATTERN_ID,
                "why_good": "Extracted from malformed response",
                "speaker": null,
            }))
        })
        .collect()
}

/// Pull match payloads out of a parsed response.
///
/// Accepts a bare array, an object carrying `matches`, `clips` or `candidates`,
/// or a lone match object. Entries without a usable start time are skipped; a missing end defaults to
/// `start + default_clip_secs`.
pub fn extract_payloads(value: &Value, default_clip_secs: f64) -> Vec<MatchPayload> {
    let list = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match LIST_KEYS.iter().find_map(|key| map.get(*key).and_then(Value::as_array)) {
            Some(items) => items.as_slice(),
            None if field(map, &["start_time", "start"]).is_some() => std::slice::from_ref(value),
            None => &[],
        },
        _ => &[],
    };

    list.iter()
        .filter_map(|item| payload_from_value(item, default_clip_secs))
        .collect()
}

fn payload_from_value(item: &Value, default_clip_secs: f64) -> Option<MatchPayload> {
    let obj = item.as_object()?;

    let start_time = field(obj, &["start_time", "start"]).and_then(parse_timestamp)?;
    let end_time = field(obj, &["end_time", "end"])
        .and_then(parse_timestamp)
        .filter(|end| *end > 0.0)
        .unwrap_or(start_time + default_clip_secs);

    let speaker = text_field(obj, &["speaker", "speaker_name"]);

    Some(MatchPayload {
        pattern_label: text_field(obj, &["pattern", "clip_type", "pattern_name"]),
        start_time,
        end_time,
        transcript_text: text_field(obj, &["transcript", "transcript_text"]),
        speaker: (!speaker.is_empty()).then_some(speaker),
        trigger_phrase: text_field(obj, &["trigger_phrase", "trigger"]),
        quotable_line: text_field(obj, &["quotable_line", "quote"]),
        why_good: text_field(obj, &["why_good", "value_reason", "why"]),
    })
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .filter(|v| !v.is_null())
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    field(obj, keys)
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Seconds from a number, `"123.4s"`, `"m:ss"` or `"h:mm:ss"`.
pub fn parse_timestamp(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim().trim_end_matches('s').trim();
            if s.contains(':') {
                let mut total = 0.0;
                for part in s.split(':') {
                    let part: f64 = part.trim().parse().ok()?;
                    total = total * 60.0 + part;
                }
                total
            } else {
                s.parse().ok()?
            }
        }
        _ => return None,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}
