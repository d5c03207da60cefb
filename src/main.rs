//! Vocabulary trainer backend.
//!
//! - Axum HTTP API under /api/v1 with bearer sessions
//! - Adaptive task selection over a static word/task catalog
//! - Per-word mastery tracking and gamification (XP, streaks, lives, tree)
//! - External fill-mask and speech-recognition model services
//!
//! Important env variables:
//!   APP_CONFIG_PATH     : path to TOML settings (all fields optional)
//!   PORT                : u16 (default 8080)
//!   WORDS_PATH          : words catalog JSON (default data/words.json)
//!   TASKS_PATH          : task catalog JSON (default data/tasks_for_model.json)
//!   DISTRACTOR_URL      : fill-mask service (default http://127.0.0.1:8000/predict/)
//!   TRANSCRIBE_URL      : speech recognizer (default http://127.0.0.1:8001/transcribe)
//!   ORACLE_TIMEOUT_SECS : per-call timeout for both services (default 20)
//!   SESSION_TTL_HOURS   : bearer session lifetime (default 72)
//!   STORE_SNAPSHOT_PATH : optional JSON file the user store is saved to
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod auth;
mod catalog;
mod clock;
mod config;
mod domain;
mod error;
mod logic;
mod oracle;
mod progress;
mod protocol;
mod routes;
mod seeds;
mod selector;
mod state;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::load();
  let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));

  // Catalog, user store and model client; a broken catalog file aborts startup.
  let state = Arc::new(AppState::new(settings)?);

  let app = build_router(state.clone());

  let listener = TcpListener::bind(addr).await?;
  info!(target: "vocab_trainer", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "vocab_trainer", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "vocab_trainer", "Shutdown signal received");
}
