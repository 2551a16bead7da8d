pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use bomsync_client::{ApiClient, DisplayCache, HttpRefresher};
use bomsync_core::{ChangeRouter, ChannelTransport, EngineConfig, Orchestrator};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Observable state
        .route("/api/state", get(routes::state::get_state))
        .route("/api/log", get(routes::state::get_log))
        .route("/api/history", get(routes::state::get_history))
        // Configuration
        .route("/api/mode", put(routes::config::put_mode))
        .route("/api/interval", put(routes::config::put_interval))
        // Triggers
        .route("/api/sync", post(routes::sync::post_sync))
        .route("/api/changes", post(routes::changes::post_change))
        .route("/api/changes/status", post(routes::changes::post_status))
        // Display data
        .route("/api/view/{name}", get(routes::view::get_view))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app)
}

/// Wire the HTTP collaborators, the engine and the webhook transport from a
/// config. Nothing runs until [`start_engine`].
pub fn assemble(config: &EngineConfig) -> anyhow::Result<(AppState, ChannelTransport)> {
    config.validate()?;
    let client = ApiClient::from_config(config)?;
    let cache = DisplayCache::new();
    let refresher = HttpRefresher::new(client.clone(), cache.clone());

    let engine = Orchestrator::builder(Arc::new(client))
        .config(config)
        .refresher(Arc::new(refresher))
        .build()?;
    let (transport, feed) = ChannelTransport::new();
    Ok((AppState::new(engine, feed, cache), transport))
}

/// Run the startup sync, then subscribe the change router. Runs in the
/// background so the HTTP surface is up while the first sync is in flight.
pub fn start_engine(app: &AppState, transport: ChannelTransport) -> JoinHandle<()> {
    let engine = app.engine.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.start().await {
            tracing::error!(error = %e, "engine start failed");
        }
        ChangeRouter::new(engine).spawn(&transport);
    })
}

pub async fn serve(config: EngineConfig) -> anyhow::Result<()> {
    let (app, transport) = assemble(&config)?;
    let listener = tokio::net::TcpListener::bind(config.server.addr()).await?;
    start_engine(&app, transport);
    serve_on(listener, app).await
}

/// Serve on a pre-bound listener so callers can bind port 0 and read the
/// actual port first.
pub async fn serve_on(listener: tokio::net::TcpListener, app: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let router = build_router(app);

    tracing::info!("bomsync server listening on http://{addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
