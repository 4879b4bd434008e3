use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod models;
mod store;
mod validate;

use store::UrlStore;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: config::AppConfig,
    pub store: UrlStore,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent — env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linklet=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting Linklet on {}:{}", config.host, config.port);
    tracing::info!("Base URL: {}", config.base_url);

    // Open the link map (the blob file is created on the first submission)
    let store = UrlStore::open(&config.storage_path)?;
    tracing::info!(
        "Link map at {} loaded with {} link(s)",
        config.storage_path,
        store.len().await
    );

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, store });

    // ── Router ─────────────────────────────────────────────────────────────
    let app = Router::new()
        // Submission form + batch submit
        .route(
            "/",
            get(handlers::home::index).post(handlers::home::shorten),
        )
        // Health check — returns 200 OK with no auth required
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        // Short-link redirect — must come LAST so the fixed routes take priority
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
