use axum::{
    Router,
    extract::{FromRef, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::error::Result;
use crate::gate::{BackendSessionValidator, SessionGate, session_gate};
use crate::{api, ui};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Server-side backend client (`backend.url`).
    pub backend: BackendClient,
    pub gate: Arc<SessionGate>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let backend = BackendClient::new(&config.backend.url, config.gate.cookie_name.clone())?
            .with_session_check_timeout(config.backend.session_check_timeout());
        let validator = Arc::new(BackendSessionValidator::new(backend.clone()));
        let gate = Arc::new(SessionGate::new(config.gate.clone(), validator));
        Ok(Self {
            config,
            backend,
            gate,
        })
    }
}

impl FromRef<AppState> for Arc<SessionGate> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.gate)
    }
}

/// Build the application router: pages, `/api`, static assets, then the
/// session gate, tracing and the whole-request timeout around all of them.
pub fn router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    Router::new()
        .merge(ui::router())
        .nest("/api", api::router())
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.gate),
            session_gate,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(move |req: Request, next: Next| {
                    request_timeout(timeout, req, next)
                }))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

async fn request_timeout(duration: Duration, req: Request, next: Next) -> axum::response::Response {
    match tokio::time::timeout(duration, next.run(req)).await {
        Ok(res) => res,
        Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
    }
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "backend.config.loaded",
        backend_url = %config.backend.url,
        public_url = %config.backend.public_url(),
        "Backend configuration loaded"
    );

    let state = AppState::new(Arc::clone(&config))?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        timeout_disabled = config.resilience.timeout_disabled,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!(name: "server.shutdown", "Shutdown signal received");
}
