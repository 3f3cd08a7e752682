//! Broadcast hub: the single owner of the live connection registry.
//!
//! The registry lives inside [`Hub::run`] and nothing else can touch it.
//! Every interaction (register, unregister, broadcast, query) is a command on
//! one bounded mailbox, so all of them are observed in a single global order:
//! a connection whose registration was accepted before a broadcast was
//! submitted receives that broadcast and every later one, in submission order,
//! unless it is ejected.
//!
//! Broadcasting never waits on clients. The envelope is encoded once by the
//! caller, the frame is offered to the mailbox with `try_send`, and the loop
//! offers it to every connection queue with `try_send`. A connection whose
//! queue is full is ejected on the spot.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use maintix_core::{ConnectionId, EventPublisher, TicketEvent};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::envelope::{self, Frame};
use crate::errors::{HubError, Result};
use crate::metrics::{
    HUB_BROADCAST_RECIPIENTS, HUB_BROADCASTS_TOTAL, HUB_EJECTIONS_TOTAL, HUB_MAILBOX_FULL_TOTAL,
    WS_CONNECTIONS_ACTIVE,
};
use crate::websocket::connection::{Connection, SendOutcome};

/// Hub sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of the command mailbox.
    pub mailbox_capacity: usize,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            outbound_queue_capacity: 64,
        }
    }
}

enum HubCommand {
    Register(Arc<Connection>),
    Unregister(ConnectionId),
    Broadcast { event_type: String, frame: Frame },
    Snapshot(oneshot::Sender<Vec<ConnectionId>>),
}

/// The hub event loop and the registry it owns.
pub struct Hub {
    rx: mpsc::Receiver<HubCommand>,
    connections: HashMap<ConnectionId, Arc<Connection>>,
    active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

/// Cloneable handle for talking to a running [`Hub`].
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    outbound_queue_capacity: usize,
}

impl Hub {
    /// Create an idle hub with an empty registry.
    ///
    /// Nothing is processed until [`run`](Self::run) is driven. Cancelling
    /// `shutdown` (or calling [`HubHandle::shutdown`]) stops the loop.
    pub fn new(config: HubConfig, shutdown: CancellationToken) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let active = Arc::new(AtomicUsize::new(0));
        let hub = Self {
            rx,
            connections: HashMap::new(),
            active: Arc::clone(&active),
            shutdown: shutdown.clone(),
        };
        let handle = HubHandle {
            tx,
            active,
            shutdown,
            outbound_queue_capacity: config.outbound_queue_capacity.max(1),
        };
        (hub, handle)
    }

    /// Create a hub and run its loop on a new task.
    pub fn spawn(config: HubConfig, shutdown: CancellationToken) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config, shutdown);
        (handle, tokio::spawn(hub.run()))
    }

    /// Run the event loop until shutdown.
    ///
    /// On exit every registered connection is closed, and commands still in
    /// the mailbox are drained: pending registrations are closed, pending
    /// queries are answered, pending broadcasts are dropped.
    pub async fn run(mut self) {
        info!("hub started");
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
        self.teardown();
    }

    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register(conn) => self.register(conn),
            HubCommand::Unregister(id) => {
                if let Some(conn) = self.connections.remove(&id) {
                    let _ = conn.close();
                    self.publish_count();
                    info!(conn_id = %id, connections = self.connections.len(), "connection unregistered");
                }
            }
            HubCommand::Broadcast { event_type, frame } => self.fan_out(&event_type, &frame),
            HubCommand::Snapshot(reply) => {
                let _ = reply.send(self.connections.keys().cloned().collect());
            }
        }
    }

    fn register(&mut self, conn: Arc<Connection>) {
        if conn.is_closed() || !conn.mark_open() {
            debug!(conn_id = %conn.id(), "connection closed before registration, skipping");
            return;
        }
        let id = conn.id().clone();
        if let Some(previous) = self.connections.insert(id.clone(), conn) {
            let _ = previous.close();
        }
        self.publish_count();
        info!(conn_id = %id, connections = self.connections.len(), "connection registered");
    }

    #[allow(clippy::cast_precision_loss)]
    fn fan_out(&mut self, event_type: &str, frame: &Frame) {
        let mut ejected = Vec::new();
        let mut recipients = 0usize;
        for (id, conn) in &self.connections {
            match conn.send(frame.clone()) {
                SendOutcome::Queued => recipients += 1,
                SendOutcome::Full => {
                    warn!(conn_id = %id, event_type, "outbound queue full, ejecting connection");
                    counter!(HUB_EJECTIONS_TOTAL).increment(1);
                    ejected.push(id.clone());
                }
                SendOutcome::Closed => {
                    debug!(conn_id = %id, event_type, "outbound queue closed, dropping connection");
                    ejected.push(id.clone());
                }
            }
        }
        if !ejected.is_empty() {
            for id in &ejected {
                if let Some(conn) = self.connections.remove(id) {
                    let _ = conn.close();
                }
            }
            self.publish_count();
        }
        counter!(HUB_BROADCASTS_TOTAL).increment(1);
        histogram!(HUB_BROADCAST_RECIPIENTS).record(recipients as f64);
        debug!(event_type, recipients, ejected = ejected.len(), "broadcast event");
    }

    fn teardown(&mut self) {
        self.rx.close();
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                HubCommand::Register(conn) => {
                    let _ = conn.close();
                }
                HubCommand::Snapshot(reply) => {
                    let _ = reply.send(Vec::new());
                }
                HubCommand::Unregister(_) | HubCommand::Broadcast { .. } => {}
            }
        }
        let closed = self.connections.len();
        for (_, conn) in self.connections.drain() {
            let _ = conn.close();
        }
        self.publish_count();
        info!(closed, "hub stopped");
    }

    #[allow(clippy::cast_precision_loss)]
    fn publish_count(&self) {
        let count = self.connections.len();
        self.active.store(count, Ordering::Release);
        gauge!(WS_CONNECTIONS_ACTIVE).set(count as f64);
    }
}

impl HubHandle {
    /// Create an unregistered connection sized for this hub.
    pub fn new_connection(&self) -> (Arc<Connection>, mpsc::Receiver<Frame>) {
        Connection::new(ConnectionId::new(), self.outbound_queue_capacity)
    }

    /// Submit a connection for registration.
    ///
    /// Waits for mailbox space, never for clients. Once this returns, any
    /// broadcast submitted afterwards reaches the connection. If the hub is
    /// gone the connection is closed and [`HubError::Closed`] returned.
    pub async fn register(&self, conn: Arc<Connection>) -> Result<()> {
        self.tx
            .send(HubCommand::Register(conn))
            .await
            .map_err(|mpsc::error::SendError(cmd)| {
                if let HubCommand::Register(conn) = cmd {
                    let _ = conn.close();
                }
                HubError::Closed
            })
    }

    /// Submit removal of a connection. Unknown or already-removed ids are a
    /// no-op.
    pub async fn unregister(&self, id: ConnectionId) -> Result<()> {
        self.tx
            .send(HubCommand::Unregister(id))
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Fan an event out to every registered connection.
    ///
    /// Encodes the envelope once and hands it to the hub without waiting.
    /// Fails with [`HubError::MailboxFull`] if the hub is saturated and
    /// [`HubError::Closed`] after shutdown; the event is dropped in both
    /// cases.
    pub fn broadcast<P: Serialize>(&self, event_type: &str, payload: &P) -> Result<()> {
        let frame = envelope::encode(event_type, payload)?;
        let cmd = HubCommand::Broadcast {
            event_type: event_type.to_owned(),
            frame,
        };
        match self.tx.try_send(cmd) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                counter!(HUB_MAILBOX_FULL_TOTAL).increment(1);
                Err(HubError::MailboxFull)
            }
            Err(TrySendError::Closed(_)) => Err(HubError::Closed),
        }
    }

    /// Ids of the registered connections, as seen by the event loop.
    pub async fn connection_ids(&self) -> Result<Vec<ConnectionId>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubCommand::Snapshot(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Number of registered connections (last value published by the loop).
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Stop the hub. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether the hub has been told to stop or has stopped.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled() || self.tx.is_closed()
    }
}

impl EventPublisher for HubHandle {
    fn publish(&self, event: &TicketEvent) {
        let event_type = event.event_type();
        if let Err(error) = self.broadcast(event_type, &event.payload()) {
            warn!(event_type, %error, "failed to publish ticket event");
        }
    }
}
