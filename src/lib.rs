//! Dogfight Server - authoritative simulation for a multiplayer space dogfight
//!
//! One world task owns every entity and advances it on an adaptive tick. WebSocket sessions
//! feed it control state and requests, and receive the per-tick update broadcast.

pub mod app;
pub mod config;
pub mod game;
pub mod geometry;
pub mod http;
pub mod util;
pub mod ws;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tracing::info;

use crate::app::AppState;
use crate::config::Config;
use crate::game::{run_world, PacingConfig, TickPacer, World, WorldRules};
use crate::http::build_router;
use crate::util::time::init_server_time;
use crate::ws::hub::ConnectionHub;

/// Session events buffered ahead of the world task
const EVENT_QUEUE_DEPTH: usize = 1024;

/// Serve on `listener` until a shutdown signal arrives
pub async fn run(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    init_server_time();

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let hub = Arc::new(ConnectionHub::new());
    let shutdown = Arc::new(Notify::new());

    let world = World::new(WorldRules::from_config(&config));
    let pacer = TickPacer::new(PacingConfig::from_config(&config));
    let world_task = tokio::spawn(run_world(
        world,
        events_rx,
        hub.clone(),
        pacer,
        shutdown.clone(),
    ));

    let router = build_router(AppState::new(config, hub, events_tx));

    let addr = listener.local_addr()?;
    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.notify_one();
    world_task.await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
