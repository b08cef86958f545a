//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::SessionEvent;
use crate::ws::hub::ConnectionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Outbound queues for every open connection
    pub hub: Arc<ConnectionHub>,
    /// Session events for the world task
    pub events: mpsc::Sender<SessionEvent>,
}

impl AppState {
    pub fn new(config: Config, hub: Arc<ConnectionHub>, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            config: Arc::new(config),
            hub,
            events,
        }
    }
}
