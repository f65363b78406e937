//! LLM normalization makes one batched assistant call per reconciliation.
//!
//! Exact reference hits are mapped locally. Everything else goes to the assistant
//! in a single prompt that enumerates the full vocabulary, because prompt cost is
//! dominated by that vocabulary and it is shared across all labels in the batch.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm_client::{extract_json_object, TextGenerator};
use crate::matching::prompts::build_normalization_prompt;
use crate::matching::{SkillMatcher, StrategyKind, StrategyOutcome};
use crate::skills::{normalize_label, SkillSet};

/// Items are kept raw so one malformed entry cannot reject the whole reply.
#[derive(Debug, Deserialize)]
struct NormalizationReply {
    #[serde(default)]
    normalized_skills: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct NormalizedItem {
    #[serde(default)]
    original: Option<String>,
    #[serde(default)]
    normalized: Option<String>,
    #[serde(default)]
    match_found: Option<bool>,
}

impl NormalizedItem {
    /// `(original, normalized)` for a usable positive match, otherwise `None`.
    fn accepted_pair(raw: Value) -> Option<(String, String)> {
        let item: NormalizedItem = match serde_json::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                debug!("Skipping malformed normalization item: {e}");
                return None;
            }
        };
        if item.match_found != Some(true) {
            return None;
        }
        Some((item.original?, item.normalized?))
    }
}

pub struct LlmNormalizationStrategy;

impl LlmNormalizationStrategy {
    fn parse_reply(raw: &str) -> Option<NormalizationReply> {
        let Some(block) = extract_json_object(raw) else {
            warn!("No JSON object found in normalization reply");
            return None;
        };
        match serde_json::from_str(block) {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!("Normalization reply is not valid JSON: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl SkillMatcher for LlmNormalizationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LlmNormalization
    }

    async fn map_skills_to_reference(
        &self,
        labels: &[String],
        reference: &SkillSet,
        assistant: Option<&dyn TextGenerator>,
    ) -> StrategyOutcome {
        let mut outcome = StrategyOutcome::default();
        let mut pending: Vec<String> = Vec::new();

        for label in labels {
            let key = normalize_label(label);
            if key.is_empty() || outcome.mapping.contains_key(&key) {
                continue;
            }
            match reference.get(key.as_str()) {
                Some(existing) => {
                    outcome.mapping.insert(key, Some(existing.clone()));
                }
                None => {
                    outcome.mapping.insert(key.clone(), None);
                    pending.push(key);
                }
            }
        }

        if pending.is_empty() {
            return outcome;
        }

        let Some(assistant) = assistant else {
            warn!(
                "No assistant configured, {} skills left unnormalized",
                pending.len()
            );
            outcome.degraded = true;
            return outcome;
        };

        let vocabulary: Vec<&str> = reference.iter().map(|s| s.as_str()).collect();
        let prompt = build_normalization_prompt(&pending, &vocabulary);

        let raw = match assistant.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skill normalization call failed: {e}");
                outcome.degraded = true;
                return outcome;
            }
        };

        let Some(reply) = Self::parse_reply(&raw) else {
            outcome.degraded = true;
            return outcome;
        };

        let mut resolved = 0;
        for (original, normalized) in reply
            .normalized_skills
            .into_iter()
            .filter_map(NormalizedItem::accepted_pair)
        {
            // Only answer for labels we actually asked about.
            let Some(slot) = outcome.mapping.get_mut(&normalize_label(&original)) else {
                continue;
            };
            if slot.is_some() {
                continue;
            }
            if let Some(skill) = reference.get(normalize_label(&normalized).as_str()) {
                *slot = Some(skill.clone());
                resolved += 1;
            }
        }

        info!(
            "{resolved} of {} skills normalized via LLM",
            pending.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::testing::ScriptedAssistant;
    use crate::skills::{skill_set, Skill};

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn reference() -> SkillSet {
        skill_set(["spring boot", "python", "google cloud platform (gcp)"])
    }

    #[tokio::test]
    async fn test_exact_hits_skip_the_assistant() {
        let assistant = ScriptedAssistant::replying("{}");
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(&labels(&["Python"]), &reference(), Some(&assistant))
            .await;
        assert_eq!(outcome.mapping["python"], Skill::new("python"));
        assert!(assistant.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_batched_prompt_lists_pending_and_vocabulary() {
        let assistant = ScriptedAssistant::replying("{\"normalized_skills\": []}");
        LlmNormalizationStrategy
            .map_skills_to_reference(
                &labels(&["SpringBoot", "GCP", "python"]),
                &reference(),
                Some(&assistant),
            )
            .await;

        let prompts = assistant.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("springboot, gcp"));
        assert!(prompts[0].contains("google cloud platform (gcp), python, spring boot"));
    }

    #[tokio::test]
    async fn test_reply_wrapped_in_prose_is_parsed() {
        let reply = r#"Here is the mapping you asked for:
```json
{"normalized_skills": [
  {"original": "SpringBoot", "normalized": "Spring Boot", "match_found": true},
  {"original": "GCP", "normalized": "google cloud platform (gcp)", "match_found": true},
  {"original": "Data Visualisation", "normalized": "Data Visualisation", "match_found": false}
]}
```"#;
        let assistant = ScriptedAssistant::replying(reply);
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(
                &labels(&["SpringBoot", "GCP", "Data Visualisation"]),
                &reference(),
                Some(&assistant),
            )
            .await;

        assert_eq!(outcome.mapping["springboot"], Skill::new("spring boot"));
        assert_eq!(
            outcome.mapping["gcp"],
            Skill::new("google cloud platform (gcp)")
        );
        assert_eq!(outcome.mapping["data visualisation"], None);
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_null_or_malformed_items_do_not_discard_valid_matches() {
        let reply = r#"{"normalized_skills": [
            {"original": "SpringBoot", "normalized": "spring boot", "match_found": true},
            {"original": "Data Viz", "normalized": null, "match_found": true},
            {"original": "GCP", "normalized": 42, "match_found": "yes"},
            "not an object"
        ]}"#;
        let assistant = ScriptedAssistant::replying(reply);
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(
                &labels(&["SpringBoot", "Data Viz", "GCP"]),
                &reference(),
                Some(&assistant),
            )
            .await;

        assert_eq!(outcome.mapping["springboot"], Skill::new("spring boot"));
        assert_eq!(outcome.mapping["data viz"], None);
        assert_eq!(outcome.mapping["gcp"], None);
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_match_outside_reference_is_rejected() {
        let reply = r#"{"normalized_skills": [
            {"original": "k8s", "normalized": "kubernetes", "match_found": true}
        ]}"#;
        let assistant = ScriptedAssistant::replying(reply);
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(&labels(&["k8s"]), &reference(), Some(&assistant))
            .await;
        assert_eq!(outcome.mapping["k8s"], None);
    }

    #[tokio::test]
    async fn test_labels_missing_from_reply_map_to_none() {
        let reply = r#"{"normalized_skills": [
            {"original": "SpringBoot", "normalized": "spring boot", "match_found": true},
            {"original": "never asked", "normalized": "python", "match_found": true}
        ]}"#;
        let assistant = ScriptedAssistant::replying(reply);
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(&labels(&["SpringBoot", "Terraform Cloud"]), &reference(), Some(&assistant))
            .await;
        assert_eq!(outcome.mapping.len(), 2);
        assert_eq!(outcome.mapping["springboot"], Skill::new("spring boot"));
        assert_eq!(outcome.mapping["terraform cloud"], None);
    }

    #[tokio::test]
    async fn test_assistant_failure_degrades_to_none() {
        let assistant = ScriptedAssistant::failing(503);
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(&labels(&["SpringBoot", "GCP"]), &reference(), Some(&assistant))
            .await;
        assert_eq!(outcome.mapping["springboot"], None);
        assert_eq!(outcome.mapping["gcp"], None);
        assert!(outcome.degraded);
    }

    #[tokio::test]
    async fn test_non_json_reply_degrades_to_none() {
        let assistant = ScriptedAssistant::replying("I'm sorry, I can't help with that.");
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(&labels(&["SpringBoot"]), &reference(), Some(&assistant))
            .await;
        assert_eq!(outcome.mapping["springboot"], None);
        assert!(outcome.degraded);
    }

    #[tokio::test]
    async fn test_missing_assistant_degrades_to_none() {
        let outcome = LlmNormalizationStrategy
            .map_skills_to_reference(&labels(&["SpringBoot", "python"]), &reference(), None)
            .await;
        assert_eq!(outcome.mapping["springboot"], None);
        assert_eq!(outcome.mapping["python"], Skill::new("python"));
        assert!(outcome.degraded);
    }
}
