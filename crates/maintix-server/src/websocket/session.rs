//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.
//!
//! Each session registers a [`Connection`] with the hub, then runs a writer
//! task (drains the outbound queue, sends pings) and a reader task (watches
//! for pongs, close frames, and errors). Whichever task ends first requests
//! unregistration and closes the connection, which stops the other one.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::envelope::Frame;
use crate::hub::HubHandle;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};

use super::connection::Connection;

/// Ping cadence and liveness deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between server pings.
    pub interval: Duration,
    /// Disconnect after this long without inbound activity.
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(90),
        }
    }
}

/// Why the writer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterExit {
    Cancelled,
    QueueClosed,
    WriteFailed,
    HeartbeatTimeout,
}

/// Run a session for a freshly upgraded socket.
#[instrument(skip_all, fields(conn_id = tracing::field::Empty))]
pub async fn run_ws_session(ws: WebSocket, hub: HubHandle, heartbeat: HeartbeatConfig) {
    let (connection, outbound) = hub.new_connection();
    let _ = Span::current().record("conn_id", tracing::field::display(connection.id()));

    if let Err(error) = hub.register(Arc::clone(&connection)).await {
        warn!(%error, "hub unavailable, dropping connection");
        connection.mark_closed();
        return;
    }

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);

    let (sink, stream) = ws.split();
    let writer = tokio::spawn(
        run_writer(sink, outbound, Arc::clone(&connection), hub.clone(), heartbeat)
            .in_current_span(),
    );
    let reader = tokio::spawn(
        run_reader(stream, Arc::clone(&connection), hub).in_current_span(),
    );

    let (writer_result, reader_result) = tokio::join!(writer, reader);
    if let Err(error) = writer_result {
        warn!(%error, "writer task failed");
    }
    if let Err(error) = reader_result {
        warn!(%error, "reader task failed");
    }

    connection.mark_closed();
    info!(duration_secs = connection.age().as_secs(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

/// Drain the outbound queue to the socket in FIFO order, pinging on the
/// heartbeat interval.
async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Frame>,
    connection: Arc<Connection>,
    hub: HubHandle,
    heartbeat: HeartbeatConfig,
) {
    let cancel = connection.cancellation();
    let mut ping = tokio::time::interval(heartbeat.interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick
    let _ = ping.tick().await;

    let exit = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break WriterExit::Cancelled,
            frame = outbound.recv() => {
                let Some(frame) = frame else { break WriterExit::QueueClosed };
                if let Err(error) = sink.send(Message::Text(frame.as_str().to_owned().into())).await {
                    debug!(%error, "write failed");
                    break WriterExit::WriteFailed;
                }
            }
            _ = ping.tick() => {
                if connection.last_seen_elapsed() > heartbeat.timeout {
                    warn!(timeout_secs = heartbeat.timeout.as_secs(), "client unresponsive, disconnecting");
                    break WriterExit::HeartbeatTimeout;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break WriterExit::WriteFailed;
                }
            }
        }
    };

    debug!(?exit, "writer stopped");
    if exit != WriterExit::WriteFailed {
        let _ = sink.send(Message::Close(None)).await;
    }
    let _ = sink.close().await;
    release(&connection, &hub).await;
}

/// Watch the inbound half. The hub is push-only, so data frames are ignored.
async fn run_reader(mut stream: SplitStream<WebSocket>, connection: Arc<Connection>, hub: HubHandle) {
    let cancel = connection.cancellation();
    loop {
        let msg = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = stream.next() => msg,
        };
        match msg {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => connection.mark_alive(),
            Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                connection.mark_alive();
                debug!("ignoring inbound data frame");
            }
            Some(Ok(Message::Close(frame))) => {
                info!(?frame, "client sent close frame");
                break;
            }
            Some(Err(error)) => {
                debug!(%error, "read failed");
                break;
            }
            None => break,
        }
    }
    release(&connection, &hub).await;
}

/// Request unregistration (once per connection) and close.
async fn release(connection: &Connection, hub: &HubHandle) {
    if connection.request_unregister() && hub.unregister(connection.id().clone()).await.is_err() {
        debug!("hub already stopped");
    }
    let _ = connection.close();
}
