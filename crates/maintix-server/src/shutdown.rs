//! Stop sequence for the listener and the hub.
//!
//! One root token fans out to everything the server spawned. The hub runs on
//! a child token so it can also be stopped on its own (tests do this) without
//! tearing down the listener.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Grace period when the caller does not pick one.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Owns the root token for one server instance.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Fresh coordinator, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root token. The listener's graceful-shutdown future waits on it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token for the hub loop: cancelled with the root, cancellable alone.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Cancel the root token. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the root token, then join `tasks` in order against one shared
    /// deadline.
    ///
    /// Tasks still running at the deadline are aborted. Returns their names.
    pub async fn stop_tasks(
        &self,
        tasks: Vec<(&'static str, JoinHandle<()>)>,
        grace: Option<Duration>,
    ) -> Vec<&'static str> {
        let grace = grace.unwrap_or(DEFAULT_GRACE);
        let deadline = Instant::now() + grace;
        self.shutdown();
        info!(tasks = tasks.len(), grace_ms = grace.as_millis(), "stopping server tasks");

        let mut aborted = Vec::new();
        for (name, mut handle) in tasks {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!(task = name, "task stopped"),
                Ok(Err(error)) => warn!(task = name, %error, "task ended abnormally"),
                Err(_) => {
                    warn!(task = name, "task still running at deadline, aborting");
                    handle.abort();
                    aborted.push(name);
                }
            }
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        assert!(!ShutdownCoordinator::new().is_shutting_down());
    }

    #[test]
    fn hub_token_follows_root_but_not_back() {
        let coord = ShutdownCoordinator::new();
        let hub = coord.child_token();
        hub.cancel();
        assert!(!coord.is_shutting_down());

        let hub = coord.child_token();
        coord.shutdown();
        coord.shutdown();
        assert!(hub.is_cancelled());
    }

    #[tokio::test]
    async fn cooperative_tasks_all_stop() {
        let coord = ShutdownCoordinator::new();
        let listener = coord.token();
        let hub = coord.child_token();
        let tasks = vec![
            ("listener", tokio::spawn(async move { listener.cancelled().await })),
            ("hub", tokio::spawn(async move { hub.cancelled().await })),
        ];

        let aborted = coord.stop_tasks(tasks, None).await;
        assert!(aborted.is_empty());
        assert!(coord.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_task_is_aborted_at_deadline() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let tasks = vec![
            ("hub", tokio::spawn(async move { token.cancelled().await })),
            (
                "listener",
                tokio::spawn(tokio::time::sleep(Duration::from_secs(300))),
            ),
        ];

        let aborted = coord
            .stop_tasks(tasks, Some(Duration::from_millis(100)))
            .await;
        assert_eq!(aborted, ["listener"]);
    }

    #[tokio::test]
    async fn panicked_task_is_not_reported_as_aborted() {
        let coord = ShutdownCoordinator::new();
        let fail = true;
        let tasks = vec![("hub", tokio::spawn(async move { assert!(!fail, "boom") }))];
        assert!(coord.stop_tasks(tasks, None).await.is_empty());
    }
}
