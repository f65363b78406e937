// Skill normalization prompt template.
// Placeholders: {labels}, {reference}

pub const SKILL_NORMALIZATION_PROMPT: &str = r#"Map each resume skill below onto the OFFICIAL SKILL VOCABULARY.

RESUME SKILLS:
{labels}

OFFICIAL SKILL VOCABULARY (use these values EXACTLY as written, never modify them):
{reference}

RULES:
1. Map every resume skill to AT MOST ONE value that appears verbatim in the vocabulary.
2. When several values could fit, choose the one spelled exactly as in the vocabulary.
3. Do NOT expand or contract acronyms (e.g. "JMS" is not "Java Message Service").
4. Do NOT fix spelling, enrich, or otherwise transform names.
5. If a resume skill has no counterpart in the vocabulary:
   - "match_found": false
   - "normalized": the resume skill, unchanged
6. Return one item for EVERY resume skill, in the same order.

RESPONSE FORMAT (this JSON object only, no surrounding text):
{
  "normalized_skills": [
    {"original": "Spring", "normalized": "spring boot", "match_found": true},
    {"original": "UnknownTech", "normalized": "UnknownTech", "match_found": false}
  ]
}"#;

pub fn build_normalization_prompt(labels: &[String], reference: &[&str]) -> String {
    SKILL_NORMALIZATION_PROMPT
        .replace("{labels}", &labels.join(", "))
        .replace("{reference}", &reference.join(", "))
}
