//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the `/metrics` endpoint. Call once at
/// startup, before anything records.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Registered connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connection lifetime in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Upgrades refused because of the connection limit (counter).
pub const WS_REJECTED_TOTAL: &str = "ws_rejected_total";
/// Broadcasts fanned out by the hub (counter).
pub const HUB_BROADCASTS_TOTAL: &str = "hub_broadcasts_total";
/// Recipients per broadcast (histogram).
pub const HUB_BROADCAST_RECIPIENTS: &str = "hub_broadcast_recipients";
/// Connections ejected for a full outbound queue (counter).
pub const HUB_EJECTIONS_TOTAL: &str = "hub_ejections_total";
/// Broadcasts rejected because the hub mailbox was full (counter).
pub const HUB_MAILBOX_FULL_TOTAL: &str = "hub_mailbox_full_total";
