use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::llm_client::TextGenerator;
use crate::matching::{SkillMatcher, StrategyKind, StrategyOutcome};
use crate::skills::index::SemanticSkillIndex;
use crate::skills::{normalize_label, SkillSet};

/// Nearest-neighbor matching against the semantic index.
pub struct SemanticStrategy {
    index: Arc<SemanticSkillIndex>,
}

impl SemanticStrategy {
    pub fn new(index: Arc<SemanticSkillIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SkillMatcher for SemanticStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Semantic
    }

    async fn map_skills_to_reference(
        &self,
        labels: &[String],
        reference: &SkillSet,
        _assistant: Option<&dyn TextGenerator>,
    ) -> StrategyOutcome {
        let mut outcome = StrategyOutcome::default();

        for label in labels {
            let key = normalize_label(label);
            if key.is_empty() || outcome.mapping.contains_key(&key) {
                continue;
            }

            if let Some(existing) = reference.get(key.as_str()) {
                outcome.mapping.insert(key, Some(existing.clone()));
                continue;
            }

            let resolved = match self.index.find_nearest(&key).await {
                // The index can lag the authoritative set; only accept current members.
                Ok(Some(neighbor)) if reference.contains(&neighbor) => {
                    debug!("'{key}' resolved semantically to '{neighbor}'");
                    Some(neighbor)
                }
                Ok(Some(stale)) => {
                    debug!("'{key}' matched '{stale}' which is no longer canonical");
                    None
                }
                Ok(None) => None,
                Err(e) => {
                    error!("Semantic lookup failed for '{key}': {e}");
                    outcome.degraded = true;
                    None
                }
            };
            outcome.mapping.insert(key, resolved);
        }

        outcome
    }
}
