mod api;
mod config;
mod error;
mod extractor;
mod price_refresh;
mod pricing;
mod state;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::latency::ExtractionLatency;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::extractor::{Extractor, HttpPageSource};
use crate::price_refresh::PriceRefresher;
use crate::state::PriceStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        target_url = %cfg.target_url,
        band_min = cfg.band.min,
        band_max = cfg.band.max,
        interval_secs = cfg.refresh_interval_secs,
        "Starting pricer: {} (band {}..{}, every {}s)",
        cfg.target_url,
        cfg.band.min,
        cfg.band.max,
        cfg.refresh_interval_secs,
    );

    // --- Shared state ---
    let store = PriceStore::new(cfg.currency_prefix.clone());
    let latency = Arc::new(ExtractionLatency::new());

    // --- Extractor ---
    let source = HttpPageSource::new(
        cfg.target_url.clone(),
        &cfg.user_agent,
        Duration::from_secs(cfg.fetch_timeout_secs),
    )?;
    let extractor = Extractor::new(
        Arc::new(source),
        cfg.band,
        Duration::from_secs(cfg.extraction_deadline_secs()),
    );

    // Price refresher (startup extraction + every refresh_interval_secs)
    let refresher = Arc::new(PriceRefresher::new(
        extractor,
        Arc::clone(&store),
        Arc::clone(&latency),
        Duration::from_secs(cfg.refresh_interval_secs),
    ));
    tokio::spawn(Arc::clone(&refresher).run());

    // HTTP API server
    let api_state = ApiState { store, refresher, latency };
    let app = router(api_state, &cfg.static_dir);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
