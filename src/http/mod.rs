//! HTTP surface over the operation service.

pub mod handlers;
pub mod types;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::application::OperationService;

pub fn router(service: OperationService) -> Router {
    Router::new()
        .route("/operations", post(handlers::create_operation))
        .route("/operations/{id}", get(handlers::get_operation))
        .route("/operations/{id}/confirm", post(handlers::confirm_operation))
        .with_state(service)
}

/// Serve the API until Ctrl-C.
pub async fn serve(service: OperationService, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, fee_rate = %service.fee_rate(), "listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutting down");
}
