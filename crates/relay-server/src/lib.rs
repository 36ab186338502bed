//! # relay-server
//!
//! WebSocket host for the relay: configuration, the axum endpoint that
//! upgrades connections and drives one session per socket, and metrics.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{app, run_server, serve, AppState};
