//! Network, hub, and heartbeat settings.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Maximum concurrent live-update connections.
    pub max_connections: usize,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 1024,
            max_message_size: 64 * 1024,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Broadcast hub sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Capacity of the hub command mailbox. Broadcasts submitted while it is
    /// full are rejected.
    pub mailbox_capacity: usize,
    /// Frames buffered per connection before the connection is ejected.
    pub outbound_queue_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            outbound_queue_capacity: 64,
        }
    }
}

/// WebSocket ping/pong liveness settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeartbeatSettings {
    /// Seconds between server pings.
    pub interval_secs: u64,
    /// Seconds of silence after which a client is dropped.
    pub timeout_secs: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_secs: 90,
        }
    }
}
