use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::api::latency::ExtractionLatency;
use crate::error::AppError;
use crate::price_refresh::PriceRefresher;
use crate::pricing::{PremiumTable, PremiumsUpdate};
use crate::state::PriceStore;
use crate::types::{PriceCache, PriceStatus};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<PriceStore>,
    pub refresher: Arc<PriceRefresher>,
    pub latency: Arc<ExtractionLatency>,
}

pub fn router(state: ApiState, static_dir: &str) -> Router {
    Router::new()
        .route("/api/prices", get(get_prices))
        .route("/api/refresh", post(refresh))
        .route("/api/update-base-price", post(update_base_price))
        .route("/api/premiums", get(get_premiums))
        .route("/api/update-premiums", post(update_premiums))
        .route("/api/health", get(health))
        .route("/api/stats/latency", get(get_stats_latency))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasePriceRequest {
    pub base_price: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub prices: PriceCache,
}

#[derive(Serialize)]
pub struct PremiumsResponse {
    pub success: bool,
    pub premiums: PremiumTable,
    pub prices: PriceCache,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_updated: Option<DateTime<Utc>>,
    pub price_status: PriceStatus,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_prices(State(state): State<ApiState>) -> Json<PriceCache> {
    Json(state.store.snapshot())
}

async fn refresh(State(state): State<ApiState>) -> Json<PriceCache> {
    Json(state.refresher.refresh_now().await)
}

async fn update_base_price(
    State(state): State<ApiState>,
    body: Result<Json<BasePriceRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::InvalidManualInput(e.body_text()))?;
    let price = parse_base_price(req.base_price.as_ref())?;

    let prices = state.store.apply_manual(price)?;
    info!(price, "Manual base price set: {price:.2}");

    Ok(Json(UpdateResponse { success: true, prices }))
}

async fn get_premiums(State(state): State<ApiState>) -> Json<PremiumTable> {
    Json(state.store.premiums())
}

async fn update_premiums(
    State(state): State<ApiState>,
    body: Result<Json<PremiumsUpdate>, JsonRejection>,
) -> Result<Json<PremiumsResponse>, AppError> {
    let Json(update) = body.map_err(|e| AppError::InvalidPremiums(e.body_text()))?;
    if update.is_empty() {
        info!("Premium update with no fields; returning current table");
    }

    let (premiums, prices) = state.store.update_premiums(&update)?;
    info!(
        minted = update.minted.as_ref().map_or(0, |m| m.len()),
        cast = update.cast.as_ref().map_or(0, |m| m.len()),
        lunar = update.lunar.is_some(),
        lunar_oz = update.lunar_oz.is_some(),
        "Premiums updated",
    );

    Ok(Json(PremiumsResponse { success: true, premiums, prices }))
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let snap = state.store.snapshot();
    Json(HealthResponse {
        status: "ok",
        last_updated: snap.last_updated(),
        price_status: snap.status,
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        p50_ms,
        p95_ms,
        p99_ms,
        sample_count: state.latency.len(),
    })
}

/// Accepts a JSON number or a numeric string. Anything else is a 400.
fn parse_base_price(value: Option<&serde_json::Value>) -> Result<f64, AppError> {
    let price = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match price {
        Some(p) if p.is_finite() && p > 0.0 => Ok(p),
        _ => Err(AppError::InvalidManualInput(
            "basePrice must be a positive number".to_string(),
        )),
    }
}
