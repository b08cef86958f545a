//! Connection registry and non-blocking outbound delivery

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::game::{ConnectionId, Outbound};
use crate::ws::protocol::ServerMsg;

/// Per-connection outbound queues, written by the world task and drained by each
/// session's writer task
#[derive(Default)]
pub struct ConnectionHub {
    outboxes: DashMap<ConnectionId, mpsc::Sender<String>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a bounded outbox for a connection
    pub fn register(&self, conn_id: ConnectionId, capacity: usize) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.outboxes.insert(conn_id, tx);
        rx
    }

    pub fn unregister(&self, conn_id: ConnectionId) {
        self.outboxes.remove(&conn_id);
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    fn deliver(conn_id: ConnectionId, tx: &mpsc::Sender<String>, text: String) {
        match tx.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(conn_id = %conn_id, "Client lagging, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = %conn_id, "Outbox closed, dropping message");
            }
        }
    }
}

fn encode(msg: &ServerMsg) -> Option<String> {
    serde_json::to_string(msg)
        .map_err(|e| error!(error = %e, "Failed to serialize server message"))
        .ok()
}

impl Outbound for ConnectionHub {
    fn send(&self, conn_id: ConnectionId, msg: &ServerMsg) {
        let Some(tx) = self.outboxes.get(&conn_id) else {
            return;
        };
        if let Some(text) = encode(msg) {
            Self::deliver(conn_id, tx.value(), text);
        }
    }

    fn broadcast(&self, msg: &ServerMsg) -> usize {
        // Serialized once, shared by every connection
        let Some(text) = encode(msg) else {
            return 0;
        };

        for entry in self.outboxes.iter() {
            Self::deliver(*entry.key(), entry.value(), text.clone());
        }
        text.len()
    }
}
