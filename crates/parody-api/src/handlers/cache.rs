//! Cache administration handlers.

use axum::extract::State;
use axum::Json;
use parody_cache::CacheStats;
use serde::Serialize;
use tracing::info;

use crate::metrics::set_cache_entries;
use crate::state::AppState;

/// Current cache occupancy.
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    let stats = state.cache.stats().await;
    set_cache_entries(stats.total);
    Json(stats)
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// Drop every cached artifact.
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.stats().await.total;
    state.cache.clear().await;
    set_cache_entries(0);

    info!(cleared = cleared, "Cache cleared");
    Json(ClearResponse { cleared })
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// Remove expired entries now instead of waiting for the periodic sweep.
pub async fn cleanup_cache(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.cache.cleanup().await;
    set_cache_entries(state.cache.stats().await.total);

    info!(removed = removed, "Cache cleanup");
    Json(CleanupResponse { removed })
}
