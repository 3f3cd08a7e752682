//! Hub error types.

use thiserror::Error;

/// Errors returned to callers of the hub.
///
/// None of these are fatal to the hub itself; a failed broadcast only means
/// that one event was not fanned out.
#[derive(Debug, Error)]
pub enum HubError {
    /// The payload could not be serialized into an envelope.
    #[error("failed to encode event envelope: {0}")]
    Encode(#[from] serde_json::Error),
    /// The hub mailbox is saturated; the broadcast was dropped.
    #[error("hub mailbox is full")]
    MailboxFull,
    /// The hub has shut down.
    #[error("hub is shut down")]
    Closed,
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
