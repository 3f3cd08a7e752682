//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while the hub runs, `"shutting_down"` afterwards.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered live-update connections.
    pub connections: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, hub_running: bool) -> HealthResponse {
    HealthResponse {
        status: if hub_running { "ok" } else { "shutting_down" },
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, true);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn status_after_hub_stop() {
        let resp = health_check(Instant::now(), 0, false);
        assert_eq!(resp.status, "shutting_down");
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, 0, true);
        assert!(resp.uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let resp = health_check(Instant::now(), 2, true);
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 2);
        assert!(parsed["uptime_secs"].is_number());
    }
}
