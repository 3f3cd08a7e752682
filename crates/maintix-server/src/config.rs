//! Server configuration.

use std::time::Duration;

use maintix_settings::MaintixSettings;

use crate::hub::HubConfig;
use crate::websocket::session::HeartbeatConfig;

/// Configuration for the maintix server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without inbound activity.
    pub heartbeat_timeout_secs: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Hub command mailbox capacity.
    pub hub_mailbox_capacity: usize,
    /// Per-connection outbound queue capacity.
    pub outbound_queue_capacity: usize,
    /// CORS origins. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Hub sizing derived from this config.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            mailbox_capacity: self.hub_mailbox_capacity,
            outbound_queue_capacity: self.outbound_queue_capacity,
        }
    }

    /// Heartbeat timing derived from this config.
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(self.heartbeat_interval_secs.max(1)),
            timeout: Duration::from_secs(self.heartbeat_timeout_secs.max(1)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let hub = HubConfig::default();
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            hub_mailbox_capacity: hub.mailbox_capacity,
            outbound_queue_capacity: hub.outbound_queue_capacity,
            allowed_origins: Vec::new(),
        }
    }
}

impl From<&MaintixSettings> for ServerConfig {
    fn from(settings: &MaintixSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_connections: settings.server.max_connections,
            heartbeat_interval_secs: settings.heartbeat.interval_secs,
            heartbeat_timeout_secs: settings.heartbeat.timeout_secs,
            max_message_size: settings.server.max_message_size,
            hub_mailbox_capacity: settings.hub.mailbox_capacity,
            outbound_queue_capacity: settings.hub.outbound_queue_capacity,
            allowed_origins: settings.server.allowed_origins.clone(),
        }
    }
}
