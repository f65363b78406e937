use anyhow::{bail, Context, Result};

use crate::matching::StrategyKind;
use crate::skills::embedding::DEFAULT_EMBEDDING_MODEL;
use crate::skills::index::{SimilarityConfig, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K};

const DEFAULT_DICTIONARY_KEY: &str = "skills:dictionary";
const DEFAULT_INDEX_KEY: &str = "skills:embeddings";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub gemini_api_key: String,
    /// Optional: without it the LLM strategy degrades every lookup to "no match".
    pub anthropic_api_key: Option<String>,
    pub match_strategy: StrategyKind,
    pub dictionary_key: String,
    pub index_key: String,
    pub similarity: SimilarityConfig,
    pub embedding_model: String,
    pub seed_on_startup: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let similarity = SimilarityConfig {
            threshold: parse_env("SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD)?,
            top_k: parse_env("SIMILARITY_TOP_K", DEFAULT_TOP_K)?,
        };
        validate_similarity(&similarity)?;

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            match_strategy: StrategyKind::from_name(
                &std::env::var("SKILL_MATCH_STRATEGY").unwrap_or_else(|_| "default".to_string()),
            ),
            dictionary_key: std::env::var("SKILLS_DICTIONARY_KEY")
                .unwrap_or_else(|_| DEFAULT_DICTIONARY_KEY.to_string()),
            index_key: std::env::var("SKILLS_INDEX_KEY")
                .unwrap_or_else(|_| DEFAULT_INDEX_KEY.to_string()),
            similarity,
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            seed_on_startup: parse_env("SEED_ON_STARTUP", true)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn validate_similarity(similarity: &SimilarityConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&similarity.threshold) {
        bail!(
            "SIMILARITY_THRESHOLD must be within [0, 1], got {}",
            similarity.threshold
        );
    }
    if similarity.top_k == 0 {
        bail!("SIMILARITY_TOP_K must be at least 1");
    }
    Ok(())
}
