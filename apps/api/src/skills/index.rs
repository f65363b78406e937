//! Semantic skill index: a similarity-searchable projection of the canonical set.
//!
//! Entries are keyed by the canonical skill string itself, so lookups by name are
//! direct and similarity queries walk the embeddings. Inserts are add-if-absent:
//! embeddings for a fixed label never change, so an existing entry is never rewritten.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::skills::embedding::{Embedder, EmbeddingError};
use crate::skills::{normalize_label, skill_set, Skill, SkillSet, StoreError};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;
pub const DEFAULT_TOP_K: usize = 1;

/// Neighbor acceptance policy. A neighbor qualifies only when its score is
/// strictly greater than `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityConfig {
    pub threshold: f64,
    pub top_k: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl SimilarityConfig {
    pub fn accepts(&self, score: f64) -> bool {
        score > self.threshold
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A scored nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub score: f64,
}

/// Raw vector storage. Implementations must make `insert_if_absent` atomic at the
/// storage layer; callers never rely on a separate existence check for correctness.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Stores the embedding under `id` unless the id exists. Returns whether it was stored.
    async fn insert_if_absent(&self, id: &str, embedding: &[f32]) -> Result<bool, StoreError>;

    async fn contains(&self, id: &str) -> Result<bool, StoreError>;

    /// Missing ids are tolerated.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Up to `k` neighbors, best first.
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError>;

    async fn ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Cosine similarity. Zero-norm or mismatched vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Brute-force top-k. Ties break on id so results are deterministic.
fn rank_neighbors<'a, I>(entries: I, query: &[f32], k: usize) -> Vec<Neighbor>
where
    I: IntoIterator<Item = (&'a String, &'a Vec<f32>)>,
{
    let mut scored: Vec<Neighbor> = entries
        .into_iter()
        .map(|(id, embedding)| Neighbor {
            id: id.clone(),
            score: cosine_similarity(query, embedding),
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    scored.truncate(k);
    scored
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend: one HASH, field = skill id, value = JSON embedding
// ────────────────────────────────────────────────────────────────────────────

/// Decodes stored vectors. Corrupt entries are logged and left out of the search.
fn decode_embeddings(key: &str, raw: BTreeMap<String, String>) -> BTreeMap<String, Vec<f32>> {
    raw.into_iter()
        .filter_map(|(id, encoded)| match serde_json::from_str::<Vec<f32>>(&encoded) {
            Ok(embedding) => Some((id, embedding)),
            Err(e) => {
                warn!("Skipping corrupt embedding for '{id}' in '{key}': {e}");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct RedisVectorBackend {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisVectorBackend {
    pub async fn connect(client: &redis::Client, key: impl Into<String>) -> Result<Self, StoreError> {
        let conn = client.get_multiplexed_async_connection().await?;
        let key = key.into();
        info!("Semantic skill index bound to Redis hash '{key}'");
        Ok(Self { conn, key })
    }
}

#[async_trait]
impl VectorBackend for RedisVectorBackend {
    async fn insert_if_absent(&self, id: &str, embedding: &[f32]) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let encoded = serde_json::to_string(embedding)?;
        let stored: bool = conn.hset_nx(&self.key, id, encoded).await?;
        Ok(stored)
    }

    async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.hexists(&self.key, id).await?)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let removed: usize = conn.hdel(&self.key, ids).await?;
        debug!("HDEL {}: {removed} of {} existed", self.key, ids.len());
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: BTreeMap<String, String> = conn.hgetall(&self.key).await?;
        Ok(rank_neighbors(&decode_embeddings(&self.key, raw), query, k))
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.hkeys(&self.key).await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryVectorBackend {
    entries: Arc<RwLock<BTreeMap<String, Vec<f32>>>>,
}

#[async_trait]
impl VectorBackend for InMemoryVectorBackend {
    async fn insert_if_absent(&self, id: &str, embedding: &[f32]) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(id) {
            return Ok(false);
        }
        entries.insert(id.to_string(), embedding.to_vec());
        Ok(true)
    }

    async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().await.contains_key(id))
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        let entries = self.entries.read().await;
        Ok(rank_neighbors(entries.iter(), query, k))
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SemanticSkillIndex
// ────────────────────────────────────────────────────────────────────────────

pub struct SemanticSkillIndex {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn VectorBackend>,
    similarity: SimilarityConfig,
}

impl SemanticSkillIndex {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn VectorBackend>,
        similarity: SimilarityConfig,
    ) -> Self {
        Self {
            embedder,
            backend,
            similarity,
        }
    }

    pub fn similarity(&self) -> SimilarityConfig {
        self.similarity
    }

    /// Adds an entry for each skill not already indexed. Existing ids are skipped,
    /// not overwritten. Returns the number of entries actually written.
    pub async fn upsert(&self, skills: &SkillSet) -> Result<usize, IndexError> {
        let mut written = 0;
        for skill in skills {
            if self.backend.contains(skill.as_str()).await? {
                info!("Skill '{skill}' already indexed, skipping");
                continue;
            }
            let embedding = self.embedder.embed(skill.as_str()).await?;
            if self
                .backend
                .insert_if_absent(skill.as_str(), &embedding)
                .await?
            {
                info!("Indexed skill '{skill}'");
                written += 1;
            } else {
                warn!("Skill '{skill}' was indexed concurrently, keeping existing entry");
            }
        }
        Ok(written)
    }

    pub async fn delete(&self, skills: &SkillSet) -> Result<(), IndexError> {
        let ids: Vec<String> = skills.iter().map(|s| s.as_str().to_string()).collect();
        self.backend.delete(&ids).await?;
        info!("Removed {} skills from the semantic index", ids.len());
        Ok(())
    }

    /// The closest indexed skill, only if it clears the similarity threshold.
    pub async fn find_nearest(&self, label: &str) -> Result<Option<Skill>, IndexError> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return Ok(None);
        }
        let query = self.embedder.embed(&normalized).await?;
        let neighbors = self
            .backend
            .nearest(&query, self.similarity.top_k.max(1))
            .await?;

        let Some(best) = neighbors.into_iter().next() else {
            debug!("Semantic index is empty, no neighbor for '{normalized}'");
            return Ok(None);
        };

        if self.similarity.accepts(best.score) {
            debug!(
                "'{normalized}' matched '{}' (score {:.4})",
                best.id, best.score
            );
            Ok(Skill::new(&best.id))
        } else {
            debug!(
                "No neighbor above {} for '{normalized}' (best '{}' at {:.4})",
                self.similarity.threshold, best.id, best.score
            );
            Ok(None)
        }
    }

    pub async fn list_all(&self) -> Result<SkillSet, IndexError> {
        Ok(skill_set(self.backend.ids().await?))
    }
}
