//! Catalog of rhetorical "viral patterns" and the lookup used to turn a model's
//! free-form pattern label into a catalog entry.

use serde::{Deserialize, Serialize};

/// Pattern id given to candidates salvaged by regex from a malformed response.
pub const EXTRACTED_PATTERN_ID: &str = "EXTRACTED";

/// Minimum Jaro-Winkler similarity for a fuzzy label match.
const FUZZY_LABEL_THRESHOLD: f64 = 0.88;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    pub trigger_phrases: Vec<String>,
    pub weight: f64,
}

impl PatternDefinition {
    /// First trigger phrase of this pattern occurring in `text`, ignoring case.
    pub fn trigger_in(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.trigger_phrases.iter()
            .find(|t| lowered.contains(&t.to_lowercase()))
            .map(String::as_str)
    }
}

/// Read-only catalog, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: Vec<PatternDefinition>,
    extracted: PatternDefinition,
}

impl PatternCatalog {
    pub fn new(patterns: Vec<PatternDefinition>, extracted_weight: f64) -> Self {
        let patterns = patterns.into_iter()
            .map(|mut p| {
                p.trigger_phrases = p.trigger_phrases.iter().map(|t| t.to_lowercase()).collect();
                p
            })
            .collect();
        Self {
            patterns,
            extracted: PatternDefinition {
                id: EXTRACTED_PATTERN_ID.to_string(),
                display_name: "Extracted".to_string(),
                description: "Recovered from a malformed model response".to_string(),
                examples: Vec::new(),
                trigger_phrases: Vec::new(),
                weight: extracted_weight,
            },
        }
    }

    pub fn patterns(&self) -> &[PatternDefinition] {
        &self.patterns
    }

    pub fn get(&self, id: &str) -> Option<&PatternDefinition> {
        if id == EXTRACTED_PATTERN_ID {
            return Some(&self.extracted);
        }
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Numbered catalog description embedded in discovery prompts.
    pub fn describe(&self) -> String {
        self.patterns.iter()
            .enumerate()
            .map(|(i, p)| {
                match p.examples.first() {
                    Some(example) => format!("{}. {}: {}\n   Example: \"{}\"", i + 1, p.display_name, p.description, example),
                    None => format!("{}. {}: {}", i + 1, p.display_name, p.description),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Map a model-supplied label to a catalog entry.
    ///
    /// Tried in order: id or display name contained in the label, any word of an id
    /// contained in the label, fuzzy display-name match, then trigger-phrase
    /// detection over `trigger_hint` and `text`.
    pub fn resolve(&self, label: &str, trigger_hint: &str, text: &str) -> Option<&PatternDefinition> {
        let label = normalize_label(label);

        if !label.is_empty() {
            if label == EXTRACTED_PATTERN_ID.to_lowercase() {
                return Some(&self.extracted);
            }

            if let Some(p) = self.patterns.iter().find(|p| {
                label.contains(&p.id.replace('_', " ")) || label.contains(&normalize_label(&p.display_name))
            }) {
                return Some(p);
            }

            if let Some(p) = self.patterns.iter().find(|p| {
                p.id.split('_').any(|word| word.len() > 2 && label.contains(word))
            }) {
                return Some(p);
            }

            let fuzzy = self.patterns.iter()
                .map(|p| (p, strsim::jaro_winkler(&label, &normalize_label(&p.display_name))))
                .filter(|(_, sim)| *sim >= FUZZY_LABEL_THRESHOLD)
                .max_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((p, _)) = fuzzy {
                return Some(p);
            }
        }

        self.detect(trigger_hint).or_else(|| self.detect(text)).map(|(p, _)| p)
    }

    /// Find the highest-weight pattern whose trigger vocabulary occurs in `text`.
    /// Returns the pattern and the trigger phrase that matched.
    pub fn detect(&self, text: &str) -> Option<(&PatternDefinition, &str)> {
        let lowered = text.to_lowercase();
        if lowered.trim().is_empty() {
            return None;
        }

        let mut best: Option<(&PatternDefinition, &str)> = None;
        for pattern in &self.patterns {
            if let Some(trigger) = pattern.trigger_phrases.iter().find(|t| lowered.contains(t.as_str())) {
                let better = match best {
                    Some((current, _)) => pattern.weight > current.weight,
                    None => true,
                };
                if better {
                    best = Some((pattern, trigger.as_str()));
                }
            }
        }
        best
    }
}

fn normalize_label(label: &str) -> String {
    label.trim()
        .to_lowercase()
        .replace(['-', '/', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new(default_patterns(), 1.0)
    }
}

fn pattern(id: &str, name: &str, description: &str, examples: &[&str], triggers: &[&str], weight: f64) -> PatternDefinition {
    PatternDefinition {
        id: id.to_string(),
        display_name: name.to_string(),
        description: description.to_string(),
        examples: examples.iter().map(|s| s.to_string()).collect(),
        trigger_phrases: triggers.iter().map(|s| s.to_string()).collect(),
        weight,
    }
}

/// Patterns that tend to travel on social feeds, weighted by how well they travel.
pub fn default_patterns() -> Vec<PatternDefinition> {
    vec![
        pattern(
            "contrast", "Contrast/Paradox",
            "Two opposing ideas that create tension",
            &["There's never been a worse time to be X... and never been a better time to be Y",
              "Everyone thinks X but the reality is Y"],
            &["never been worse", "never been better", "isn't about", "on one hand",
              "on the other", "the opposite is true", "but here's the thing"],
            1.3,
        ),
        pattern(
            "bold_prediction", "Bold Prediction",
            "Clear prediction stated with conviction",
            &["My thesis is we'll see this market ten times bigger",
              "This is going to be the biggest shift we've ever seen"],
            &["my thesis is", "i think we'll see", "i predict", "i expect", "going to happen",
              "will be worth", "by end of year", "this cycle", "next cycle"],
            1.4,
        ),
        pattern(
            "contradiction_callout", "Contradiction Callout",
            "Pointing out a logical inconsistency",
            &["You can't really have it both ways", "The problem with that logic is..."],
            &["can't have it both ways", "doesn't make sense", "the problem with",
              "contradiction", "but wait", "that's not how it works"],
            1.2,
        ),
        pattern(
            "consequence_chain", "If-Then Consequence",
            "Logical chain leading to a surprising outcome",
            &["If we see a real shock... the fallout doesn't stop at portfolios"],
            &["if we see", "if this happens", "the fallout", "leads to", "which means",
              "the second order effect", "what people don't realize"],
            1.2,
        ),
        pattern(
            "hot_take", "Hot Take/Death Declaration",
            "Declaring something dead, over, or a thing of the past",
            &["Tribal wars are just a thing of the past", "X is dead"],
            &["is dead", "is over", "is done", "thing of the past", "nobody cares about",
              "doesn't matter anymore", "forget about"],
            1.3,
        ),
        pattern(
            "meme_analogy", "Meme/Cultural Reference",
            "Using a meme or pop-culture reference to explain a concept",
            &["It's like that meme of the soldier still fighting a war that ended decades ago"],
            &["that meme", "like the meme", "reminds me of", "it's like when", "you know how",
              "remember when", "there's this joke"],
            1.25,
        ),
        pattern(
            "sarcastic_mock", "Sarcastic Devil's Advocate",
            "Mocking a bad take through exaggeration",
            &["How dare this guy be successful... what a disgusting human being"],
            &["how dare", "what a crime", "oh no", "god forbid", "imagine thinking", "the audacity"],
            1.2,
        ),
        pattern(
            "specific_numbers", "Specific Numbers/Data",
            "Concrete numbers that make the point real",
            &["A 10% drop wipes out a fraction of a fraction of a cent"],
            &["percent", "%", "million", "billion", "hundred", "thousand", "2x", "10x", "100x"],
            1.1,
        ),
        pattern(
            "walkthrough", "Step-by-Step Walkthrough",
            "Explaining a process that builds to a punchline",
            &["First you do X, then Y happens, and suddenly Z"],
            &["first you", "then you", "step one", "step two", "here's how it works",
              "the process is", "and suddenly"],
            1.15,
        ),
        pattern(
            "redefine", "Redefining a Term",
            "Giving new meaning to something familiar",
            &["It isn't a payment protocol... it's pay-per-call for the agent economy"],
            &["isn't really", "isn't just", "it's actually", "what it really means",
              "the real meaning", "think of it as", "better way to think about"],
            1.3,
        ),
    ]
}
