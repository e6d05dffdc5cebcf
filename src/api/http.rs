// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! HTTP adapter for the dashboard

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{Dashboard, DashboardState};
use crate::config::HttpConfig;
use crate::db::HistoryEntry;

pub fn router(dashboard: Dashboard) -> Router {
    Router::new()
        .route("/api/dashboard_data", get(dashboard_data))
        .route("/api/history/{shelf_id}", get(history))
        .route("/health", get(health))
        .with_state(dashboard)
}

/// Serve until the shutdown signal fires
pub async fn serve(dashboard: Dashboard, config: HttpConfig, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Dashboard API listening on http://{}", addr);

    axum::serve(listener, router(dashboard))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("Dashboard API shutting down");
        })
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    "OK"
}

async fn dashboard_data(State(dashboard): State<Dashboard>) -> Json<DashboardState> {
    Json(dashboard.current_state())
}

async fn history(
    State(dashboard): State<Dashboard>,
    Path(shelf_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, (StatusCode, String)> {
    // SQLite is synchronous; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || dashboard.history(&shelf_id)).await;

    match result {
        Ok(Ok(entries)) => Ok(Json(entries)),
        Ok(Err(e)) => {
            warn!("History query failed: {}", e);
            Err((StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
