//! `MaintixServer`: Axum HTTP + WebSocket server around the hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use maintix_core::EventPublisher;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::hub::{Hub, HubHandle};
use crate::metrics::{WS_REJECTED_TOTAL, render};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Hub handle for registering sessions.
    pub hub: HubHandle,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
    /// One permit per allowed live socket, taken before the upgrade.
    pub slots: Arc<Semaphore>,
}

/// The maintix server.
///
/// Owns the hub task. Shutting the server down stops the listener and the
/// hub, which closes every live connection.
pub struct MaintixServer {
    config: Arc<ServerConfig>,
    hub: HubHandle,
    hub_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    slots: Arc<Semaphore>,
    start_time: Instant,
}

impl MaintixServer {
    /// Create a server and start its hub. Must be called within a Tokio
    /// runtime.
    pub fn new(config: ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let (hub, hub_task) = Hub::spawn(config.hub_config(), shutdown.child_token());
        let slots = Arc::new(Semaphore::new(
            config.max_connections.min(Semaphore::MAX_PERMITS),
        ));
        Self {
            config: Arc::new(config),
            hub,
            hub_task: Mutex::new(Some(hub_task)),
            shutdown,
            metrics,
            slots,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            slots: Arc::clone(&self.slots),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .with_state(state)
            .layer(cors_layer(&self.config.allowed_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve until shutdown.
    ///
    /// Returns the bound address and the serve task handle.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "maintix server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });

        Ok((local_addr, handle))
    }

    /// Stop the listener and the hub, waiting up to `timeout` for both.
    pub async fn stop(&self, serve: JoinHandle<()>, timeout: Option<Duration>) {
        let mut tasks = vec![("listener", serve)];
        if let Some(hub_task) = self.hub_task.lock().take() {
            tasks.push(("hub", hub_task));
        }
        let aborted = self.shutdown.stop_tasks(tasks, timeout).await;
        if !aborted.is_empty() {
            warn!(?aborted, "server stopped with tasks aborted");
        }
    }

    /// Get the hub handle (for publishers).
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// The hub as an [`EventPublisher`], for wiring into services that emit
    /// ticket events.
    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        Arc::new(self.hub.clone())
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.hub.connection_count(),
        !state.hub.is_shut_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(handle),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.hub.is_shut_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    // The permit is held until the session ends. A failed upgrade drops the
    // callback, and the permit with it.
    let Ok(slot) = Arc::clone(&state.slots).try_acquire_owned() else {
        warn!(
            max = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        counter!(WS_REJECTED_TOTAL).increment(1);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let hub = state.hub.clone();
    let heartbeat = state.config.heartbeat();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            run_ws_session(socket, hub, heartbeat).await;
            drop(slot);
        })
}
