//! Canonical skill store: the exact-match, authoritative set of skills.
//!
//! Production backend is a Redis SET under a fixed dictionary key. Every write is
//! set-add / set-remove at the storage layer, so two concurrent ingestions that
//! both decide "new" for the same label still end up with a single member.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::skills::{skill_set, SkillSet, StoreError};

/// Atomically seeds the set only when it holds no members.
const SEED_IF_EMPTY_LUA: &str = r#"
if redis.call('SCARD', KEYS[1]) == 0 then
    redis.call('SADD', KEYS[1], unpack(ARGV))
    return 1
end
return 0
"#;

/// Exact-lookup skill store. Carried as `Arc<dyn CanonicalSkillStore>`.
#[async_trait]
pub trait CanonicalSkillStore: Send + Sync {
    /// Full canonical set, order-irrelevant.
    async fn get_all(&self) -> Result<SkillSet, StoreError>;

    /// Idempotent bulk insert. Members already present are no-ops.
    async fn add(&self, skills: &SkillSet) -> Result<(), StoreError>;

    /// Idempotent bulk delete. Absent members are no-ops.
    async fn remove(&self, skills: &SkillSet) -> Result<(), StoreError>;

    /// Destructive overwrite of the whole set. Administrative reset only.
    async fn replace_all(&self, skills: &SkillSet) -> Result<(), StoreError>;

    /// Initializes the set only if it is currently empty. Returns whether it seeded.
    async fn seed_if_empty(&self, skills: &SkillSet) -> Result<bool, StoreError>;
}

fn members(skills: &SkillSet) -> Vec<&str> {
    skills.iter().map(|s| s.as_str()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisSkillStore {
    conn: MultiplexedConnection,
    key: String,
    seed_script: Script,
}

impl RedisSkillStore {
    pub async fn connect(client: &redis::Client, key: impl Into<String>) -> Result<Self, StoreError> {
        let conn = client.get_multiplexed_async_connection().await?;
        let key = key.into();
        info!("Canonical skill store bound to Redis set '{key}'");
        Ok(Self {
            conn,
            key,
            seed_script: Script::new(SEED_IF_EMPTY_LUA),
        })
    }
}

#[async_trait]
impl CanonicalSkillStore for RedisSkillStore {
    async fn get_all(&self) -> Result<SkillSet, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.smembers(&self.key).await?;
        Ok(skill_set(raw))
    }

    async fn add(&self, skills: &SkillSet) -> Result<(), StoreError> {
        if skills.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let added: usize = conn.sadd(&self.key, members(skills)).await?;
        debug!("SADD {}: {added} of {} were new", self.key, skills.len());
        Ok(())
    }

    async fn remove(&self, skills: &SkillSet) -> Result<(), StoreError> {
        if skills.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let removed: usize = conn.srem(&self.key, members(skills)).await?;
        debug!("SREM {}: {removed} of {} existed", self.key, skills.len());
        Ok(())
    }

    async fn replace_all(&self, skills: &SkillSet) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(&self.key).ignore();
        if !skills.is_empty() {
            pipe.sadd(&self.key, members(skills)).ignore();
        }
        let () = pipe.query_async(&mut conn).await?;
        info!("Replaced skills dictionary with {} skills", skills.len());
        Ok(())
    }

    async fn seed_if_empty(&self, skills: &SkillSet) -> Result<bool, StoreError> {
        if skills.is_empty() {
            return Ok(false);
        }
        let mut conn = self.conn.clone();
        let seeded: i64 = self
            .seed_script
            .key(&self.key)
            .arg(members(skills))
            .invoke_async(&mut conn)
            .await?;
        Ok(seeded == 1)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend (local runs and tests)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemorySkillStore {
    skills: Arc<RwLock<SkillSet>>,
}

impl InMemorySkillStore {
    pub fn with_skills(skills: SkillSet) -> Self {
        Self {
            skills: Arc::new(RwLock::new(skills)),
        }
    }
}

#[async_trait]
impl CanonicalSkillStore for InMemorySkillStore {
    async fn get_all(&self) -> Result<SkillSet, StoreError> {
        Ok(self.skills.read().await.clone())
    }

    async fn add(&self, skills: &SkillSet) -> Result<(), StoreError> {
        self.skills.write().await.extend(skills.iter().cloned());
        Ok(())
    }

    async fn remove(&self, skills: &SkillSet) -> Result<(), StoreError> {
        self.skills.write().await.retain(|s| !skills.contains(s));
        Ok(())
    }

    async fn replace_all(&self, skills: &SkillSet) -> Result<(), StoreError> {
        *self.skills.write().await = skills.clone();
        Ok(())
    }

    async fn seed_if_empty(&self, skills: &SkillSet) -> Result<bool, StoreError> {
        // Check and write under one lock so a concurrent add cannot slip in between.
        let mut guard = self.skills.write().await;
        if !guard.is_empty() || skills.is_empty() {
            return Ok(false);
        }
        guard.extend(skills.iter().cloned());
        Ok(true)
    }
}
