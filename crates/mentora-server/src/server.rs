use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mentora_core::identity::IdentityVerifier;
use mentora_core::provider::Scorer;
use mentora_engine::{Clock, Collaborators};
use mentora_settings::{MentoraSettings, ServerSettings};
use mentora_store::ExamSessionRepo;

use crate::handlers;
use crate::registry::LiveSessions;
use crate::ws;

/// Uploads carry base64 page images.
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Server configuration.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<MentoraSettings>,
    pub repo: ExamSessionRepo,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub collaborators: Collaborators,
    pub scorer: Arc<dyn Scorer>,
    pub clock: Arc<dyn Clock>,
    pub live: Arc<LiveSessions>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/score", post(handlers::score))
        .route("/history", get(handlers::history))
        .route("/speakers", get(handlers::speakers))
        .route("/health", get(handlers::health))
        .route("/ws/session/{session_id}", get(ws::session_socket))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve in the background. Port 0 picks a free port.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let live = Arc::clone(&state.live);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;

    tracing::info!(%addr, "Mentora server started");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(signal.cancelled_owned())
            .await
        {
            tracing::error!(error = %e, "server stopped with error");
        }
    });

    Ok(ServerHandle {
        addr,
        port: addr.port(),
        live,
        shutdown,
        server,
    })
}

/// Handle returned by `start()`; keeps the server task alive.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub port: u16,
    live: Arc<LiveSessions>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Cancel live sessions, stop accepting connections, and wait for the
    /// server task.
    pub async fn shutdown(self) {
        let cancelled = self.live.cancel_all();
        tracing::info!(live_sessions = cancelled, "shutting down");
        self.shutdown.cancel();
        let _ = self.server.await;
    }
}
