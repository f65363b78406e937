use serde::{Deserialize, Serialize};

use crate::matching::StrategyKind;
use crate::skills::Skill;

/// How a label was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Already canonical after normalization.
    Exact,
    /// Near-duplicate found in the semantic index.
    Semantic,
    /// Normalized by the assistant.
    Llm,
    /// Admitted into the dictionary as a new canonical skill.
    New,
    /// Blank label, nothing to resolve.
    Unmatched,
}

impl From<StrategyKind> for MatchMethod {
    fn from(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Semantic => MatchMethod::Semantic,
            StrategyKind::LlmNormalization => MatchMethod::Llm,
        }
    }
}

/// Per-label reconciliation result. Transient: never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub input_label: String,
    pub resolved_skill: Option<Skill>,
    pub method: MatchMethod,
}
