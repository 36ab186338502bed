//! Prometheus instrumentation for the relay.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`start_metrics_server`] installs the exporter.

use anyhow::{Context, Result};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tenvis_relay_core::{Disposition, RegistryStats};
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "relay_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "relay_connections_active";
    pub const FRAMES_TOTAL: &str = "relay_frames_total";
    pub const FRAMES_BYTES: &str = "relay_frames_bytes";
    pub const FRAMES_DROPPED: &str = "relay_frames_dropped_total";
    pub const DELIVERIES_TOTAL: &str = "relay_deliveries_total";
    pub const DESTINATIONS_ACTIVE: &str = "relay_destinations_active";
    pub const SUBSCRIPTIONS_ACTIVE: &str = "relay_subscriptions_active";
    pub const PROCESSING_SECONDS: &str = "relay_processing_seconds";
    pub const ERRORS_TOTAL: &str = "relay_errors_total";
}

/// Which way a frame crossed the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Register descriptions for every relay metric.
pub fn describe() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(names::CONNECTIONS_TOTAL, "WebSocket connections accepted");
    describe_gauge!(names::CONNECTIONS_ACTIVE, "WebSocket connections open");
    describe_counter!(names::FRAMES_TOTAL, "STOMP frames read or written");
    describe_counter!(names::FRAMES_BYTES, "Encoded bytes of STOMP frames");
    describe_counter!(names::FRAMES_DROPPED, "Inbound frames dropped by the relay");
    describe_counter!(names::DELIVERIES_TOTAL, "MESSAGE frames queued for subscribers");
    describe_gauge!(names::DESTINATIONS_ACTIVE, "Destinations with subscribers");
    describe_gauge!(names::SUBSCRIPTIONS_ACTIVE, "Registered subscriptions");
    describe_histogram!(
        names::PROCESSING_SECONDS,
        "Time to handle one WebSocket message"
    );
    describe_counter!(names::ERRORS_TOTAL, "Decode and transport errors");
}

/// Install the Prometheus exporter on `0.0.0.0:port`.
///
/// # Errors
///
/// Returns an error if the exporter cannot bind or a recorder is already
/// installed.
pub fn start_metrics_server(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start metrics exporter on {addr}"))?;
    describe();

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Count one frame and its encoded size.
pub fn record_frame(direction: Direction, bytes: usize) {
    let label = direction.label();
    counter!(names::FRAMES_TOTAL, "direction" => label).increment(1);
    counter!(names::FRAMES_BYTES, "direction" => label).increment(bytes as u64);
}

/// Account for how the relay handled an inbound frame.
pub fn record_disposition(disposition: Option<&Disposition>) {
    match disposition {
        Some(Disposition::Delivered(count)) => {
            counter!(names::DELIVERIES_TOTAL).increment(*count as u64);
        }
        Some(_) => {}
        None => counter!(names::FRAMES_DROPPED).increment(1),
    }
}

/// Publish the registry's current size.
pub fn record_registry(stats: &RegistryStats) {
    gauge!(names::DESTINATIONS_ACTIVE).set(stats.destination_count as f64);
    gauge!(names::SUBSCRIPTIONS_ACTIVE).set(stats.total_subscriptions as f64);
}

pub fn record_processing(elapsed: Duration) {
    histogram!(names::PROCESSING_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_error(kind: &'static str) {
    counter!(names::ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Keeps `relay_connections_active` in step with a connection's lifetime.
pub struct ConnectionGauge(());

impl ConnectionGauge {
    #[must_use]
    pub fn open() -> Self {
        counter!(names::CONNECTIONS_TOTAL).increment(1);
        gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
        Self(())
    }
}

impl Drop for ConnectionGauge {
    fn drop(&mut self) {
        gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
    }
}
