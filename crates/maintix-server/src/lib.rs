//! # maintix-server
//!
//! Real-time ticket event hub and the Axum server that exposes it.
//!
//! - [`hub`]: single-owner connection registry with non-blocking fan-out
//! - [`websocket`]: per-connection outbound queue, writer/reader tasks, heartbeat
//! - [`envelope`]: `{type, payload, timestamp}` encoding, once per broadcast
//! - [`server`]: `/ws`, `/health`, `/metrics` routes and graceful shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod envelope;
pub mod errors;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::HubError;
pub use hub::{Hub, HubConfig, HubHandle};
pub use server::MaintixServer;
