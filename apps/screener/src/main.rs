mod analysis;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod scoring;
mod screening;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::LlmJobAnalyzer;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::{SkillMatcher, SynonymTable};
use crate::screening::evaluator::Evaluator;
use crate::screening::explanation::LlmExplanationGenerator;
use crate::screening::external::CallPolicy;
use crate::screening::similarity::{HttpSimilarityProvider, SimilarityProvider, UnindexedSimilarity};
use crate::screening::SessionCoordinator;
use crate::state::AppState;
use crate::store::{PgStore, ScreeningStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Fails fast on missing required env vars
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url, config.screening.max_concurrency).await?;
    let store: Arc<dyn ScreeningStore> = Arc::new(PgStore::new(pool));

    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.screening.external_call_max_attempts,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let similarity: Arc<dyn SimilarityProvider> = match &config.embedding_service_url {
        Some(url) => {
            info!(url = %url, "Using embedding service for semantic similarity");
            Arc::new(HttpSimilarityProvider::new(url.clone())?)
        }
        None => {
            info!("EMBEDDING_SERVICE_URL not set; semantic similarity disabled");
            Arc::new(UnindexedSimilarity)
        }
    };

    let evaluator = Evaluator::new(
        SkillMatcher::new(SynonymTable::default()),
        similarity,
        Arc::new(LlmExplanationGenerator::new(llm.clone())),
        CallPolicy::from_config(&config.screening),
    );
    let coordinator = SessionCoordinator::new(
        store.clone(),
        Arc::new(evaluator),
        Arc::new(LlmJobAnalyzer::new(llm)),
        config.screening.clone(),
    );
    info!(
        max_concurrency = config.screening.max_concurrency,
        timeout_secs = config.screening.external_call_timeout.as_secs(),
        "Screening coordinator ready"
    );

    let state = AppState {
        store,
        coordinator: Arc::new(coordinator),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
