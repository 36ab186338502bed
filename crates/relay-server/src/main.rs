//! `relay`: STOMP-over-WebSocket publish/subscribe relay.
//!
//! ```bash
//! relay                                   # defaults, or ./relay.toml if present
//! RELAY_CONFIG=/srv/relay.toml relay      # explicit config file
//! RELAY_HOST=0.0.0.0 RELAY_PORT=8080 relay
//! RUST_LOG=tenvis_relay_core=trace relay  # per-frame registry tracing
//! ```

use anyhow::Result;
use tenvis_relay_server::{run_server, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "relay=debug,tenvis_relay_core=debug,tenvis_relay_server=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting relay on {}:{}",
        config.host,
        config.port
    );

    run_server(config).await
}
