//! Skill matching strategies. Each decides whether an incoming label is an existing skill.
//!
//! Two backends, selected by configuration name:
//! - `SemanticStrategy`: nearest neighbor in the semantic index (default).
//! - `LlmNormalizationStrategy`: one batched assistant call against the full vocabulary.
//!
//! Strategies never fail a batch. Anything that goes wrong for a label degrades
//! that label to "no match" and flags the outcome as degraded.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm_client::TextGenerator;
use crate::skills::index::SemanticSkillIndex;
use crate::skills::{Skill, SkillSet};

pub mod llm;
pub mod prompts;
pub mod semantic;

pub use llm::LlmNormalizationStrategy;
pub use semantic::SemanticStrategy;

/// Normalized input label → canonical skill from the reference set, or `None`.
pub type SkillMapping = BTreeMap<String, Option<Skill>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Semantic,
    LlmNormalization,
}

impl StrategyKind {
    /// Unrecognized names fall back to `Semantic`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "llm" | "normalizer" | "llm_normalization" | "llm-normalization" => {
                Self::LlmNormalization
            }
            // "chroma" | "similarity" | "vector" | "default" and anything else
            _ => Self::Semantic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::LlmNormalization => "llm_normalization",
        }
    }
}

/// Result of one strategy call over a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutcome {
    pub mapping: SkillMapping,
    /// True when at least one label fell back to "no match" because of a failure
    /// (index error, assistant unavailable, unparsable reply).
    pub degraded: bool,
}

/// Carried as `Arc<dyn SkillMatcher>`.
#[async_trait]
pub trait SkillMatcher: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Maps every non-blank label (keyed by its normalized form) to a member of
    /// `reference` or `None`.
    async fn map_skills_to_reference(
        &self,
        labels: &[String],
        reference: &SkillSet,
        assistant: Option<&dyn TextGenerator>,
    ) -> StrategyOutcome;
}

pub fn build_matcher(kind: StrategyKind, index: Arc<SemanticSkillIndex>) -> Arc<dyn SkillMatcher> {
    match kind {
        StrategyKind::Semantic => Arc::new(SemanticStrategy::new(index)),
        StrategyKind::LlmNormalization => Arc::new(LlmNormalizationStrategy),
    }
}
