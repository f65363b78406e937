//! Rewrites the skills of a structured candidate record to their canonical forms.
//!
//! Candidate records come from the resume parser as JSON with a
//! `skills: [{ "technology": string, "years_experience": number }]` array.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::skill::SkillMatch;
use crate::skills::normalize_label;

/// The raw `skills[].technology` labels of a candidate record, in order.
pub fn candidate_skill_labels(candidate: &Value) -> Vec<String> {
    candidate
        .get("skills")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.get("technology").and_then(|t| t.as_str()).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Replaces each `technology` with its resolved canonical skill. Labels without a
/// resolution are left as they are. Returns the number of entries rewritten.
pub fn apply_to_candidate(candidate: &mut Value, matches: &[SkillMatch]) -> usize {
    let resolved: HashMap<String, &str> = matches
        .iter()
        .filter_map(|m| {
            m.resolved_skill
                .as_ref()
                .map(|skill| (normalize_label(&m.input_label), skill.as_str()))
        })
        .collect();

    let Some(skills) = candidate.get_mut("skills").and_then(|v| v.as_array_mut()) else {
        return 0;
    };

    let mut rewritten = 0;
    for entry in skills.iter_mut() {
        let Some(technology) = entry.get_mut("technology") else {
            continue;
        };
        let Some(current) = technology.as_str() else {
            continue;
        };
        if let Some(canonical) = resolved.get(&normalize_label(current)) {
            if current != *canonical {
                *technology = Value::String((*canonical).to_string());
                rewritten += 1;
            }
        }
    }
    rewritten
}
