//! Test doubles shared by the skills, matching and reconcile test modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm_client::{LlmError, TextGenerator};
use crate::skills::embedding::{Embedder, EmbeddingError};
use crate::skills::index::{Neighbor, VectorBackend};
use crate::skills::store::CanonicalSkillStore;
use crate::skills::{normalize_label, SkillSet, StoreError};

const DIMS: usize = 512;

/// Deterministic embedder: every distinct label gets its own one-hot vector,
/// aliases share the vector of their target. Orthogonal labels score 0.0,
/// a label and its alias score 1.0.
#[derive(Default)]
pub struct StaticEmbedder {
    aliases: HashMap<String, String>,
    slots: Mutex<HashMap<String, usize>>,
    calls: Arc<AtomicUsize>,
}

impl StaticEmbedder {
    pub fn with_alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases
            .insert(normalize_label(alias), normalize_label(target));
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = normalize_label(text);
        let key = self.aliases.get(&text).cloned().unwrap_or(text);
        let mut slots = self.slots.lock().unwrap();
        let next = slots.len();
        let slot = *slots.entry(key).or_insert(next);
        let mut v = vec![0.0; DIMS];
        v[slot % DIMS] = 1.0;
        Ok(v)
    }
}

/// Always returns the same single neighbor with a fixed score.
pub struct FixedScoreBackend {
    id: String,
    score: f64,
}

impl FixedScoreBackend {
    pub fn new(id: &str, score: f64) -> Self {
        Self {
            id: id.to_string(),
            score,
        }
    }
}

#[async_trait]
impl VectorBackend for FixedScoreBackend {
    async fn insert_if_absent(&self, _id: &str, _embedding: &[f32]) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(id == self.id)
    }

    async fn delete(&self, _ids: &[String]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn nearest(&self, _query: &[f32], _k: usize) -> Result<Vec<Neighbor>, StoreError> {
        Ok(vec![Neighbor {
            id: self.id.clone(),
            score: self.score,
        }])
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(vec![self.id.clone()])
    }
}

/// Vector backend whose every call fails, as if the index service were down.
#[derive(Default)]
pub struct UnreachableBackend;

#[async_trait]
impl VectorBackend for UnreachableBackend {
    async fn insert_if_absent(&self, _id: &str, _embedding: &[f32]) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("vector index offline".to_string()))
    }

    async fn contains(&self, _id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("vector index offline".to_string()))
    }

    async fn delete(&self, _ids: &[String]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("vector index offline".to_string()))
    }

    async fn nearest(&self, _query: &[f32], _k: usize) -> Result<Vec<Neighbor>, StoreError> {
        Err(StoreError::Unavailable("vector index offline".to_string()))
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("vector index offline".to_string()))
    }
}

/// Canonical store that is unreachable for every operation.
#[derive(Default)]
pub struct UnreachableStore;

#[async_trait]
impl CanonicalSkillStore for UnreachableStore {
    async fn get_all(&self) -> Result<SkillSet, StoreError> {
        Err(StoreError::Unavailable("dictionary offline".to_string()))
    }

    async fn add(&self, _skills: &SkillSet) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("dictionary offline".to_string()))
    }

    async fn remove(&self, _skills: &SkillSet) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("dictionary offline".to_string()))
    }

    async fn replace_all(&self, _skills: &SkillSet) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("dictionary offline".to_string()))
    }

    async fn seed_if_empty(&self, _skills: &SkillSet) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("dictionary offline".to_string()))
    }
}

/// Assistant that replays a canned reply (or failure) and records every prompt.
pub struct ScriptedAssistant {
    reply: Result<String, u16>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with the given API status.
    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedAssistant {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(LlmError::Api {
                status: *status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}
