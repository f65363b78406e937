mod config;
mod errors;
mod llm_client;
mod matching;
mod models;
mod reconcile;
mod routes;
mod skills;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::reconcile::ReconciliationService;
use crate::routes::build_router;
use crate::skills::embedding::GeminiEmbedder;
use crate::skills::index::{RedisVectorBackend, SemanticSkillIndex};
use crate::skills::store::RedisSkillStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting skills API v{}", env!("CARGO_PKG_VERSION"));

    // Both stores live in Redis, under separate keys
    let redis = redis::Client::open(config.redis_url.clone())?;
    let store = RedisSkillStore::connect(&redis, config.dictionary_key.clone()).await?;
    let backend = RedisVectorBackend::connect(&redis, config.index_key.clone()).await?;
    info!("Redis stores initialized");

    let embedder = GeminiEmbedder::new(config.gemini_api_key.clone(), config.embedding_model.clone());
    let index = Arc::new(SemanticSkillIndex::new(
        Arc::new(embedder),
        Arc::new(backend),
        config.similarity,
    ));
    info!(
        "Semantic index initialized (model: {}, threshold: {}, top_k: {})",
        config.embedding_model, config.similarity.threshold, config.similarity.top_k
    );

    let assistant: Option<Arc<dyn TextGenerator>> = match &config.anthropic_api_key {
        Some(key) => {
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(LlmClient::new(key.clone())))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; LLM normalization will degrade to no-match");
            None
        }
    };

    let reconciler = Arc::new(ReconciliationService::new(Arc::new(store), index, assistant));

    if config.seed_on_startup {
        let report = reconciler.seed_defaults().await?;
        info!(
            "Skills dictionary ready ({} skills, seeded: {})",
            report.dictionary_count, report.seeded
        );
    }

    let state = AppState {
        reconciler,
        default_strategy: config.match_strategy,
    };
    info!("Default matching strategy: {}", config.match_strategy.as_str());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the admin UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
