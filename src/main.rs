//! Lingvo · English trainer backend.
//!
//! Important env variables (see `config` for the full list):
//!   PORT          : u16 (default 3000)
//!   STORE_BACKEND : "postgres" (default) or "memory"
//!   DATABASE_URL  : Postgres connection string
//!   LOG_LEVEL     : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT    : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use lingvo_backend::config::ServerConfig;
use lingvo_backend::routes::build_router;
use lingvo_backend::state::AppState;
use lingvo_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = ServerConfig::from_env().map_err(|e| {
    error!(target: "lingvo_backend", error = %e, "Invalid configuration");
    e
  })?;
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  let state = Arc::new(AppState::from_config(config).await.map_err(|e| {
    error!(target: "lingvo_backend", error = %e, "Failed to initialize application state");
    e
  })?);
  info!(target: "lingvo_backend", store = state.store.kind(), "Application state ready");

  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "lingvo_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "lingvo_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "lingvo_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "lingvo_backend", "Shutdown signal received");
}
