//! Event envelope codec.
//!
//! Every broadcast is wrapped as `{"type", "payload", "timestamp"}` and
//! encoded exactly once. The resulting [`Frame`] is shared by reference
//! across all recipients.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Result;

/// Wire shape of a pushed event.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, P> {
    /// Event type, e.g. `ticket:created`.
    #[serde(rename = "type")]
    pub event_type: &'a str,
    /// Event-specific body.
    pub payload: &'a P,
    /// Time the envelope was built (RFC 3339, UTC).
    pub timestamp: DateTime<Utc>,
}

/// An encoded envelope, immutable and cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    /// The encoded JSON text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether two frames share the same allocation.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.as_str()).finish()
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Self(Arc::from(text))
    }
}

/// Build and encode an envelope stamped with the current time.
pub fn encode<P: Serialize>(event_type: &str, payload: &P) -> Result<Frame> {
    let envelope = Envelope {
        event_type,
        payload,
        timestamp: Utc::now(),
    };
    Ok(Frame::from(serde_json::to_string(&envelope)?))
}
