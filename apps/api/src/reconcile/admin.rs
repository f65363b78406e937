//! Administrative dictionary operations: listing, manual add/remove, seeding,
//! drift audit and the force resync that rebuilds the index from the dictionary.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::reconcile::service::{ReconcileError, ReconciliationService};
use crate::skills::vocabulary::primary_skills;
use crate::skills::{skill_set, Skill, SkillSet};

const REMOVAL_ATTEMPTS: u32 = 3;
const REMOVAL_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone, Serialize)]
pub struct SkillStatus {
    pub skill: Skill,
    pub in_dictionary: bool,
    pub in_index: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillInventory {
    pub skills: Vec<SkillStatus>,
    pub dictionary_count: usize,
    pub index_count: usize,
    pub total_count: usize,
}

/// Membership disagreement between the dictionary and the index.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    /// Canonical skills with no index entry.
    pub missing_from_index: Vec<Skill>,
    /// Index entries with no canonical skill.
    pub orphaned_in_index: Vec<Skill>,
    pub in_sync: bool,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResyncReport {
    pub removed_entries: usize,
    pub indexed_entries: usize,
    pub dictionary_count: usize,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub seeded: bool,
    pub dictionary_count: usize,
}

/// Retries an idempotent store operation with exponential backoff: 200ms, 400ms.
async fn with_retry<T, E, F, Fut>(operation: &str, mut attempt_fn: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < REMOVAL_ATTEMPTS => {
                let delay = Duration::from_millis(REMOVAL_BACKOFF_MS << (attempt - 1));
                warn!(
                    "{operation} attempt {attempt} failed ({e}), retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

impl ReconciliationService {
    pub async fn list_with_status(&self) -> Result<SkillInventory, ReconcileError> {
        let dictionary = self
            .store
            .get_all()
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        let indexed = self
            .index
            .list_all()
            .await
            .map_err(ReconcileError::IndexUnavailable)?;

        let skills: Vec<SkillStatus> = dictionary
            .union(&indexed)
            .map(|skill| SkillStatus {
                skill: skill.clone(),
                in_dictionary: dictionary.contains(skill),
                in_index: indexed.contains(skill),
            })
            .collect();

        Ok(SkillInventory {
            dictionary_count: dictionary.len(),
            index_count: indexed.len(),
            total_count: skills.len(),
            skills,
        })
    }

    /// Adds skills to both stores. Already-present skills are no-ops in each.
    pub async fn add_skills(&self, labels: &[String]) -> Result<SkillSet, ReconcileError> {
        let skills = skill_set(labels);
        if skills.is_empty() {
            return Ok(skills);
        }
        self.store
            .add(&skills)
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        self.index
            .upsert(&skills)
            .await
            .map_err(ReconcileError::IndexUnavailable)?;
        info!("Added {} skills to the dictionary and index", skills.len());
        Ok(skills)
    }

    /// Removes skills from the index, then from the dictionary. Each side is retried;
    /// the call only succeeds once both sides have succeeded. Absent skills are fine.
    pub async fn remove_skills(&self, labels: &[String]) -> Result<SkillSet, ReconcileError> {
        let skills = skill_set(labels);
        if skills.is_empty() {
            return Ok(skills);
        }
        with_retry("Index removal", || self.index.delete(&skills))
            .await
            .map_err(ReconcileError::IndexUnavailable)?;
        with_retry("Dictionary removal", || self.store.remove(&skills))
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        info!("Removed {} skills from the dictionary and index", skills.len());
        Ok(skills)
    }

    /// Seeds the primary vocabulary into an empty dictionary. A non-empty dictionary
    /// is left untouched, but any primary skill it still holds is indexed if missing,
    /// so a seed whose index write failed is completed on the next run.
    pub async fn seed_defaults(&self) -> Result<SeedReport, ReconcileError> {
        let primary = primary_skills();
        let seeded = self
            .store
            .seed_if_empty(&primary)
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        if seeded {
            info!("Seeded dictionary with {} primary skills", primary.len());
        } else {
            info!("Dictionary already populated, skipping seed");
        }

        let dictionary = self
            .store
            .get_all()
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        let retained: SkillSet = primary.intersection(&dictionary).cloned().collect();
        let indexed = self
            .index
            .upsert(&retained)
            .await
            .map_err(ReconcileError::IndexUnavailable)?;
        if indexed > 0 {
            info!("Indexed {indexed} primary skills missing from the semantic index");
        }

        Ok(SeedReport {
            seeded,
            dictionary_count: dictionary.len(),
        })
    }

    /// Compares dictionary and index membership. Reports drift, never fixes it.
    pub async fn audit(&self) -> Result<DriftReport, ReconcileError> {
        let dictionary = self
            .store
            .get_all()
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        let indexed = self
            .index
            .list_all()
            .await
            .map_err(ReconcileError::IndexUnavailable)?;

        let missing_from_index: Vec<Skill> = dictionary.difference(&indexed).cloned().collect();
        let orphaned_in_index: Vec<Skill> = indexed.difference(&dictionary).cloned().collect();
        let in_sync = missing_from_index.is_empty() && orphaned_in_index.is_empty();
        if !in_sync {
            warn!(
                "Skill store drift: {} missing from index, {} orphaned in index",
                missing_from_index.len(),
                orphaned_in_index.len()
            );
        }

        Ok(DriftReport {
            missing_from_index,
            orphaned_in_index,
            in_sync,
            checked_at: Utc::now(),
        })
    }

    /// Rebuilds the index from the dictionary: delete every entry, then upsert
    /// every canonical skill.
    pub async fn resync(&self) -> Result<ResyncReport, ReconcileError> {
        let existing = self
            .index
            .list_all()
            .await
            .map_err(ReconcileError::IndexUnavailable)?;
        self.index
            .delete(&existing)
            .await
            .map_err(ReconcileError::IndexUnavailable)?;

        let dictionary = self
            .store
            .get_all()
            .await
            .map_err(ReconcileError::DictionaryUnavailable)?;
        let indexed_entries = self
            .index
            .upsert(&dictionary)
            .await
            .map_err(ReconcileError::IndexUnavailable)?;

        info!(
            "Resynced semantic index: dropped {} entries, indexed {indexed_entries}",
            existing.len()
        );
        Ok(ResyncReport {
            removed_entries: existing.len(),
            indexed_entries,
            dictionary_count: dictionary.len(),
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::skills::index::{InMemoryVectorBackend, SemanticSkillIndex, SimilarityConfig};
    use crate::skills::store::{CanonicalSkillStore, InMemorySkillStore};
    use crate::skills::testing::{StaticEmbedder, UnreachableBackend};
    use crate::skills::vocabulary::PRIMARY_SKILLS;
    use crate::skills::StoreError;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn service_over(
        store: Arc<InMemorySkillStore>,
    ) -> (ReconciliationService, Arc<SemanticSkillIndex>) {
        let index = Arc::new(SemanticSkillIndex::new(
            Arc::new(StaticEmbedder::default()),
            Arc::new(InMemoryVectorBackend::default()),
            SimilarityConfig::default(),
        ));
        (
            ReconciliationService::new(store, index.clone(), None),
            index,
        )
    }

    #[tokio::test]
    async fn test_removing_absent_skill_succeeds() {
        let store = Arc::new(InMemorySkillStore::with_skills(skill_set(["python"])));
        let (service, _) = service_over(store.clone());

        service.remove_skills(&labels(&["gcp"])).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), skill_set(["python"]));
    }

    #[tokio::test]
    async fn test_remove_clears_both_stores() {
        let store = Arc::new(InMemorySkillStore::default());
        let (service, index) = service_over(store.clone());
        service
            .add_skills(&labels(&["Python", "LangChain"]))
            .await
            .unwrap();

        service.remove_skills(&labels(&["LANGCHAIN"])).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), skill_set(["python"]));
        assert_eq!(index.list_all().await.unwrap(), skill_set(["python"]));
    }

    #[tokio::test]
    async fn test_remove_fails_when_index_stays_down() {
        let store = Arc::new(InMemorySkillStore::with_skills(skill_set(["python"])));
        let index = Arc::new(SemanticSkillIndex::new(
            Arc::new(StaticEmbedder::default()),
            Arc::new(UnreachableBackend),
            SimilarityConfig::default(),
        ));
        let service = ReconciliationService::new(store.clone(), index, None);

        let err = service.remove_skills(&labels(&["python"])).await.unwrap_err();
        assert!(matches!(err, ReconcileError::IndexUnavailable(_)));
        // Dictionary untouched: removal never half-succeeds silently.
        assert!(store.get_all().await.unwrap().contains("python"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers_from_transient_failure() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), StoreError> = with_retry("test", || async {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::Unavailable("blip".to_string()))
            } else {
                Ok(())
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_after_three_attempts() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), StoreError> = with_retry("test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("down".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_seed_defaults_only_when_empty() {
        let store = Arc::new(InMemorySkillStore::default());
        let (service, index) = service_over(store.clone());

        let first = service.seed_defaults().await.unwrap();
        assert!(first.seeded);
        assert_eq!(first.dictionary_count, PRIMARY_SKILLS.len());
        assert_eq!(index.list_all().await.unwrap().len(), PRIMARY_SKILLS.len());

        service.remove_skills(&labels(&["python"])).await.unwrap();
        let second = service.seed_defaults().await.unwrap();
        assert!(!second.seeded);
        assert!(!store.get_all().await.unwrap().contains("python"));
    }

    #[tokio::test]
    async fn test_seed_defaults_completes_indexing_after_failed_first_seed() {
        let store = Arc::new(InMemorySkillStore::default());
        let broken = ReconciliationService::new(
            store.clone(),
            Arc::new(SemanticSkillIndex::new(
                Arc::new(StaticEmbedder::default()),
                Arc::new(UnreachableBackend),
                SimilarityConfig::default(),
            )),
            None,
        );
        let err = broken.seed_defaults().await.unwrap_err();
        assert!(matches!(err, ReconcileError::IndexUnavailable(_)));
        assert_eq!(store.get_all().await.unwrap().len(), PRIMARY_SKILLS.len());

        let (service, index) = service_over(store);
        let report = service.seed_defaults().await.unwrap();
        assert!(!report.seeded);
        assert_eq!(index.list_all().await.unwrap().len(), PRIMARY_SKILLS.len());
        assert!(service.audit().await.unwrap().in_sync);
    }

    #[tokio::test]
    async fn test_audit_reports_drift_in_both_directions() {
        let store = Arc::new(InMemorySkillStore::with_skills(skill_set(["python", "rust"])));
        let (service, index) = service_over(store);
        index.upsert(&skill_set(["python", "cobol"])).await.unwrap();

        let report = service.audit().await.unwrap();
        assert!(!report.in_sync);
        assert_eq!(report.missing_from_index, vec![Skill::new("rust").unwrap()]);
        assert_eq!(report.orphaned_in_index, vec![Skill::new("cobol").unwrap()]);
    }

    #[tokio::test]
    async fn test_resync_rebuilds_index_from_dictionary() {
        let store = Arc::new(InMemorySkillStore::with_skills(skill_set(["python", "rust"])));
        let (service, index) = service_over(store);
        index.upsert(&skill_set(["python", "cobol"])).await.unwrap();

        let report = service.resync().await.unwrap();
        assert_eq!(report.removed_entries, 2);
        assert_eq!(report.indexed_entries, 2);
        assert_eq!(index.list_all().await.unwrap(), skill_set(["python", "rust"]));
        assert!(service.audit().await.unwrap().in_sync);
    }

    #[tokio::test]
    async fn test_list_with_status_marks_each_side() {
        let store = Arc::new(InMemorySkillStore::with_skills(skill_set(["python", "rust"])));
        let (service, index) = service_over(store);
        index.upsert(&skill_set(["python", "cobol"])).await.unwrap();

        let inventory = service.list_with_status().await.unwrap();
        assert_eq!(inventory.total_count, 3);
        assert_eq!(inventory.dictionary_count, 2);
        assert_eq!(inventory.index_count, 2);
        let cobol = inventory
            .skills
            .iter()
            .find(|s| s.skill.as_str() == "cobol")
            .unwrap();
        assert!(!cobol.in_dictionary);
        assert!(cobol.in_index);
    }
}
