//! HTTP API for submitting plagiarism analysis jobs and polling their results

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use plagiarism_detector::{
    GitRepositorySource, Orchestrator, SimilarityEngine, embedder_for, init_production_logging,
    load_analysis_config,
};
use plagiarism_services::InMemoryJobStore;
use tracing::info;

mod detector_api;

use detector_api::{AppState, router, shutdown_signal};

const DEFAULT_ADDR: &str = "0.0.0.0:3014";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_production_logging().map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting plagiarism detector API server");

    let config = load_analysis_config(None).context("Failed to load analysis configuration")?;
    let embedder = embedder_for(&config.similarity)?;
    let engine = SimilarityEngine::new(&config.similarity, embedder);
    let source =
        GitRepositorySource::from_config(&config.sampling, config.commit_diff.max_commits);

    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(source),
        engine,
        config,
    );
    let app = router(AppState::new(orchestrator));

    let addr: SocketAddr = std::env::var("DETECTOR_API_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("Invalid DETECTOR_API_ADDR")?;
    info!("Plagiarism detector API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shut down");
    Ok(())
}
