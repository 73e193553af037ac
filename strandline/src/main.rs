//! A collaborative editing service for a version-stamped, persistent doubly-linked
//! list of anonymous nodes: clients connect over a WebSocket, issue structural
//! mutations (insert-after, delete), and receive broadcast deltas as the shared
//! list changes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tokio::signal;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Configuration and shared application state.
pub mod config;
/// The transport-boundary error types.
pub mod error;
/// The read-only snapshot query served to newly attached connections.
pub mod snapshot;
/// The per-connection WebSocket session handler.
pub mod ws;

use crate::config::{AppState, Config};

#[derive(Debug, Parser)]
#[command(about, version)]
struct Opts {
    /// Path to the configuration file.
    #[arg(short, long, env = "STRANDLINE_CONFIG", default_value = "strandline.toml")]
    pub config: String,
}

async fn healthz() -> Json<json::Value> {
    Json(json::json!({ "status": "ok" }))
}

fn router(state: Arc<AppState>, cors: tower_http::cors::CorsLayer) -> Router {
    Router::new()
        .route("/ws", get(ws::upgrade))
        .route("/healthz", get(healthz))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(trace::DefaultOnFailure::new().level(Level::ERROR)),
        )
        .layer(cors)
        .with_state(state)
}

async fn run() -> Result<(), anyhow::Error> {
    let opts = Opts::parse();

    tracing::info!("starting strandline");

    let contents = tokio::fs::read_to_string(&opts.config).await?;
    let config = Config::load(&contents)?;
    let bind_address = config.server.bind_address.clone();
    let port = config.server.port;
    let cors = config.cors.layer();

    tracing::info!("running database migrations");
    let state = AppState::from_config(&config).await?;

    let app = router(Arc::clone(&state), cors);

    let addr: SocketAddr = format!("{bind_address}:{port}").parse()?;
    tracing::info!("listening on '{addr}'");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down gracefully");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .compact()
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
