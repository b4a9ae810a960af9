//! Lingvo · English trainer backend for a Telegram Mini App.
//!
//! - Axum HTTP + WebSocket API
//! - Exercise engine, lesson runner and progress bookkeeping
//! - Postgres (sqlx) or in-memory persistence
//! - Static Mini App fallback (`STATIC_DIR`, default ./static)

pub mod catalog;
pub mod config;
pub mod content;
pub mod domain;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod recorder;
pub mod routes;
pub mod runner;
pub mod seeds;
pub mod sessions;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
