//! ReconciliationService maps raw resume skill labels onto the canonical dictionary.
//!
//! Per label: normalize → exact hit in the canonical store (no strategy call) →
//! batched strategy call for the rest → anything still unresolved is admitted as a
//! new canonical skill in both stores before it is reported.
//!
//! Store handles are injected; the exact store and the semantic index are kept as
//! two separate repositories. Nothing here makes a write to both atomic.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::TextGenerator;
use crate::matching::SkillMatcher;
use crate::models::skill::{MatchMethod, SkillMatch};
use crate::skills::index::{IndexError, SemanticSkillIndex};
use crate::skills::store::CanonicalSkillStore;
use crate::skills::{Skill, SkillSet, StoreError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The canonical set cannot be read or written. Retry the ingestion.
    #[error("Skills dictionary unavailable: {0}")]
    DictionaryUnavailable(#[source] StoreError),

    /// The semantic index rejected a write the dictionary already accepted.
    #[error("Semantic skill index unavailable: {0}")]
    IndexUnavailable(#[source] IndexError),
}

/// Output of one `reconcile` call.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// One entry per input label, in input order.
    pub matches: Vec<SkillMatch>,
    /// Skills admitted into the dictionary by this call.
    pub inserted: Vec<Skill>,
    /// Normalization fell back to "no match" for at least one label. Data is still saved.
    pub degraded: bool,
}

pub struct ReconciliationService {
    pub(super) store: Arc<dyn CanonicalSkillStore>,
    pub(super) index: Arc<SemanticSkillIndex>,
    assistant: Option<Arc<dyn TextGenerator>>,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn CanonicalSkillStore>,
        index: Arc<SemanticSkillIndex>,
        assistant: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self {
            store,
            index,
            assistant,
        }
    }

    pub fn index(&self) -> Arc<SemanticSkillIndex> {
        Arc::clone(&self.index)
    }

    pub async fn reconcile(
        &self,
        raw_labels: &[String],
        strategy: &dyn SkillMatcher,
    ) -> Result<Reconciliation, ReconcileError> {
        let canonical = self
            .store
            .get_all()
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;

        // Unique non-canonical labels, in first-seen order.
        let mut unresolved: Vec<String> = Vec::new();
        for label in raw_labels {
            if let Some(skill) = Skill::new(label) {
                if !canonical.contains(&skill) && !unresolved.iter().any(|u| u == skill.as_str()) {
                    unresolved.push(skill.into());
                }
            }
        }

        let mut resolved: BTreeMap<String, Skill> = BTreeMap::new();
        let mut new_skills = SkillSet::new();
        let mut degraded = false;

        if !unresolved.is_empty() {
            let outcome = strategy
                .map_skills_to_reference(&unresolved, &canonical, self.assistant.as_deref())
                .await;
            degraded = outcome.degraded;

            for label in &unresolved {
                match outcome.mapping.get(label).cloned().flatten() {
                    Some(skill) if canonical.contains(&skill) => {
                        resolved.insert(label.clone(), skill);
                    }
                    _ => {
                        if let Some(skill) = Skill::new(label) {
                            new_skills.insert(skill);
                        }
                    }
                }
            }
        }

        if !new_skills.is_empty() {
            self.store
                .add(&new_skills)
                .await
                .map_err(ReconcileError::DictionaryUnavailable)?;
            self.index
                .upsert(&new_skills)
                .await
                .map_err(ReconcileError::IndexUnavailable)?;
            info!("Admitted {} new skills: {:?}", new_skills.len(), new_skills);
        }

        let strategy_method = MatchMethod::from(strategy.kind());
        let mut reported_new: HashSet<Skill> = HashSet::new();
        let matches = raw_labels
            .iter()
            .map(|label| {
                let Some(skill) = Skill::new(label) else {
                    warn!("Skipping blank skill label");
                    return SkillMatch {
                        input_label: label.clone(),
                        resolved_skill: None,
                        method: MatchMethod::Unmatched,
                    };
                };
                let method = if canonical.contains(&skill) {
                    MatchMethod::Exact
                } else if let Some(target) = resolved.get(skill.as_str()) {
                    debug!("'{label}' → '{target}' ({strategy_method:?})");
                    return SkillMatch {
                        input_label: label.clone(),
                        resolved_skill: Some(target.clone()),
                        method: strategy_method,
                    };
                } else if reported_new.insert(skill.clone()) {
                    MatchMethod::New
                } else {
                    // Same new label earlier in this batch already created it.
                    MatchMethod::Exact
                };
                SkillMatch {
                    input_label: label.clone(),
                    resolved_skill: Some(skill),
                    method,
                }
            })
            .collect();

        Ok(Reconciliation {
            matches,
            inserted: new_skills.into_iter().collect(),
            degraded,
        })
    }
}
