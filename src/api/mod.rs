//! HTTP surface: admission, queue control, history and the observer stream.
//!
//! Thin axum wiring over [`Engine`]; every handler is one engine call plus
//! a JSON projection.

pub mod handlers;
pub mod sse;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::secrets::SecretString;
use crate::engine::Engine;
use crate::error::Result;
use crate::intake::IntakeConfig;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub intake: Arc<IntakeConfig>,
    /// Admin routes answer 403 while this is unset.
    pub admin_token: Option<Arc<SecretString>>,
}

impl AppState {
    pub fn new(engine: Engine, intake: IntakeConfig) -> Self {
        Self {
            engine,
            intake: Arc::new(intake),
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: Option<SecretString>) -> Self {
        self.admin_token = token.map(Arc::new);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ask", post(handlers::ask))
        .route("/api/queue", get(handlers::list_queue))
        .route("/api/queue/:id/stop", post(handlers::stop))
        .route("/api/queue/:id/answer-now", post(handlers::answer_now))
        .route("/api/history", get(handlers::history))
        .route("/api/events", post(handlers::source_event))
        .route("/events", get(sse::event_stream))
        .route("/admin/overlay/replay", post(handlers::replay))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
