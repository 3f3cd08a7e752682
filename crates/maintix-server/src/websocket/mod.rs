//! WebSocket connection state and per-client session tasks.

pub mod connection;
pub mod session;
