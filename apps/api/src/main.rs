mod config;
mod errors;
mod exploration;
mod llm_client;
mod routes;
mod state;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::exploration::catalog::{SchoolBand, StageCatalog};
use crate::exploration::engine::{CareerExplorationEngine, EngineConfig};
use crate::exploration::providers::{
    LlmChoiceProvider, LlmPlanGenerator, LlmRecommendationGenerator,
};
use crate::exploration::session::SessionStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting career exploration API v{}",
        env!("CARGO_PKG_VERSION")
    );

    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let engine_config = EngineConfig {
        max_regenerations: config.max_regenerations,
        generation_timeout: config.generation_timeout,
    };

    // One engine per band: shared LLM client, isolated session stores.
    let mut engines = HashMap::new();
    for band in [SchoolBand::Elementary, SchoolBand::Middle, SchoolBand::High] {
        let engine = CareerExplorationEngine::new(
            StageCatalog::for_band(band),
            SessionStore::new(),
            Arc::new(LlmChoiceProvider::new(llm.clone())),
            Arc::new(LlmRecommendationGenerator::new(llm.clone())),
            Arc::new(LlmPlanGenerator::new(llm.clone())),
            engine_config.clone(),
        );
        engines.insert(band, Arc::new(engine));
        info!("Engine initialized for {} school band", band.as_str());
    }

    let state = AppState {
        engines: Arc::new(engines),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
