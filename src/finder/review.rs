use super::Candidate;

/// Human-review summary of one candidate. Pure formatting; the engine never
/// calls it.
pub fn format_candidate_for_review(candidate: &Candidate) -> String {
    let duration = candidate.end_time - candidate.start_time;

    let mut lines = vec![
        format!("Score: {:.1}", candidate.total_score),
        format!("Pattern: {}", candidate.primary_pattern_name),
        format!("Time: {:.0}s - {:.0}s ({:.0}s)", candidate.start_time, candidate.end_time, duration),
        String::new(),
        "Quotable:".to_string(),
        format!("\"{}\"", candidate.quotable_line),
        String::new(),
        format!("Why: {}", candidate.why_selected),
    ];

    if candidate.matched_patterns.len() > 1 {
        let names: Vec<&str> = candidate.matched_patterns.iter().map(|m| m.pattern_name.as_str()).collect();
        lines.push(format!("Multiple patterns: {}", names.join(", ")));
    }

    if let Some(rating) = candidate.model_rating {
        match &candidate.rating_note {
            Some(note) => lines.push(format!("Model rating: {:.1}/10 ({})", rating, note)),
            None => lines.push(format!("Model rating: {:.1}/10", rating)),
        }
    }

    lines.join("\n")
}
