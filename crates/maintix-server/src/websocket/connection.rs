//! Live-update connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use maintix_core::ConnectionId;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::envelope::Frame;

/// Lifecycle of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake done, registration not yet processed by the hub.
    Connecting,
    /// Registered; receives broadcasts.
    Open,
    /// Close requested; tasks are winding down.
    Closing,
    /// Both tasks have exited.
    Closed,
}

impl ConnectionState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Result of offering a frame to a connection's outbound queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was queued.
    Queued,
    /// The queue is at capacity; the client is not keeping up.
    Full,
    /// The queue is closed; the connection is going away.
    Closed,
}

/// One connected live-update client.
///
/// The hub event loop is the only producer on the outbound queue; the
/// connection's writer task is the only consumer.
pub struct Connection {
    id: ConnectionId,
    /// Producer half of the outbound queue. Taken on close so the writer's
    /// receiver observes end-of-stream.
    tx: Mutex<Option<mpsc::Sender<Frame>>>,
    state: AtomicU8,
    closed: AtomicBool,
    unregister_requested: AtomicBool,
    cancel: CancellationToken,
    connected_at: Instant,
    /// Last pong or other inbound activity.
    last_seen: Mutex<Instant>,
}

impl Connection {
    /// Create a connection with an outbound queue of `capacity` frames.
    ///
    /// Returns the consumer half of the queue for the writer task.
    pub fn new(id: ConnectionId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let now = Instant::now();
        let conn = Arc::new(Self {
            id,
            tx: Mutex::new(Some(tx)),
            state: AtomicU8::new(ConnectionState::Connecting.as_u8()),
            closed: AtomicBool::new(false),
            unregister_requested: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            connected_at: now,
            last_seen: Mutex::new(now),
        });
        (conn, rx)
    }

    /// Connection identifier.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move `Connecting -> Open`. Fails if the connection was closed first.
    pub(crate) fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connecting.as_u8(),
                ConnectionState::Open.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Record that both socket tasks have exited.
    pub(crate) fn mark_closed(&self) {
        let _ = self.close();
        self.state
            .store(ConnectionState::Closed.as_u8(), Ordering::Release);
    }

    /// Offer a frame to the outbound queue without waiting.
    pub fn send(&self, frame: Frame) -> SendOutcome {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return SendOutcome::Closed;
        };
        match tx.try_send(frame) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => SendOutcome::Full,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Close the connection.
    ///
    /// Closes the outbound queue and cancels the reader and writer tasks.
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.state.fetch_max(ConnectionState::Closing.as_u8(), Ordering::AcqRel);
        drop(self.tx.lock().take());
        self.cancel.cancel();
        true
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Claim the single unregistration request for this connection.
    ///
    /// Returns `true` for the first caller only, whichever task gets there.
    pub fn request_unregister(&self) -> bool {
        !self.unregister_requested.swap(true, Ordering::AcqRel)
    }

    /// Token cancelled when the connection closes.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Record inbound activity (pong, ping, or data).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound activity.
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
