//! Settings type tree.

mod logging;
mod server;

pub use logging::{LogFormat, LoggingSettings};
pub use server::{HeartbeatSettings, HubSettings, ServerSettings};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object (`~/.maintix/settings.json`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintixSettings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Broadcast hub sizing.
    pub hub: HubSettings,
    /// Connection liveness.
    pub heartbeat: HeartbeatSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl MaintixSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hub.mailbox_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.mailboxCapacity must be greater than 0".into(),
            ));
        }
        if self.hub.outbound_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.outboundQueueCapacity must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be greater than 0".into(),
            ));
        }
        if self.heartbeat.interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeat.intervalSecs must be greater than 0".into(),
            ));
        }
        if self.heartbeat.timeout_secs < self.heartbeat.interval_secs {
            return Err(SettingsError::InvalidValue(format!(
                "heartbeat.timeoutSecs ({}) must be at least heartbeat.intervalSecs ({})",
                self.heartbeat.timeout_secs, self.heartbeat.interval_secs
            )));
        }
        Ok(())
    }
}
