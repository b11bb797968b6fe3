//! riskserve Server - HTTP prediction service
//!
//! Loads the liquidity and iris models once, then serves them over HTTP.
//! A model that fails to load leaves the server up: its endpoint answers with
//! a load error and `/health` reports `degraded`.
//!
//! # Usage
//! ```sh
//! MODEL_PATHS=models/liquidity_model.json PORT=8000 cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATHS` / `IRIS_MODEL_PATHS` - Comma-separated artifact candidates
//! - `BIND_ADDRESS` / `PORT` - Listener (default: 0.0.0.0:8000)
//! - `OBSERVABILITY_ENABLED` - Expose `/metrics` (default: true)

use anyhow::{Context, Result};
use riskserve::application::ml::{IrisService, PredictionService};
use riskserve::config::Config;
use riskserve::infrastructure::observability::Metrics;
use riskserve::interfaces::http::{AppState, router};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("riskserve Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: models={:?}, iris={:?}",
        config.model_paths, config.iris_model_paths
    );

    // Models are resolved before the listener binds
    let metrics = Metrics::new().context("Failed to create metrics registry")?;
    let liquidity = PredictionService::load(
        &config.model_paths,
        config.ratio_epsilon,
        config.tier_ladder.clone(),
    )
    .with_metrics(metrics.clone());
    let iris = IrisService::load(&config.iris_model_paths).with_metrics(metrics.clone());

    info!(
        "Tier ladder: {:?} (floor {})",
        liquidity.ladder().rungs(),
        liquidity.ladder().floor()
    );
    if !liquidity.is_available() {
        warn!("Liquidity model unavailable; /predict will answer with load errors");
    }
    if !config.observability_enabled {
        info!("Metrics endpoint disabled.");
    }

    let state = Arc::new(AppState::new(
        liquidity,
        iris,
        metrics,
        config.observability_enabled,
    ));
    let app = router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}. Press Ctrl+C to shutdown.", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received. Exiting...");
        })
        .await?;

    Ok(())
}
