//! Skills dictionary: the canonical skill type and the two stores that hold it.
//!
//! `CanonicalSkillStore` is the system of record. `SemanticSkillIndex` is a derived
//! projection of the same set that can always be rebuilt from the store.
//! The two are updated independently; nothing here pretends otherwise.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod embedding;
pub mod index;
pub mod store;
pub mod vocabulary;

#[cfg(test)]
pub mod testing;

/// Trim + lowercase. Every comparison and every write goes through this.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// A canonical skill name. Always normalized; construction is the only way in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Skill(String);

impl Skill {
    /// Returns `None` when the label is empty after normalization.
    pub fn new(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Skill {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
#[error("skill label is empty")]
pub struct EmptySkillLabel;

impl TryFrom<String> for Skill {
    type Error = EmptySkillLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Skill::new(&value).ok_or(EmptySkillLabel)
    }
}

impl From<Skill> for String {
    fn from(skill: Skill) -> Self {
        skill.0
    }
}

/// The canonical skill set at a point in time. Ordered so prompts and reports are stable.
pub type SkillSet = BTreeSet<Skill>;

/// Normalizes a batch of raw labels into a set, dropping empties and collapsing duplicates.
pub fn skill_set<I, S>(labels: I) -> SkillSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .filter_map(|l| Skill::new(l.as_ref()))
        .collect()
}

/// Errors raised by either storage backend (exact set or vector hash).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
