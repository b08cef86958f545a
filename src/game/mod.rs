//! Game simulation modules

pub mod combat;
pub mod entity;
pub mod physics;
pub mod scheduler;
pub mod snapshot;
pub mod world;

pub use entity::{Entity, EntityId, EntityType, Membership, Role, WorldMutator};
pub use scheduler::{run_world, PacingConfig, TickPacer};
pub use world::{World, WorldRules};

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// Opaque handle the transport assigns to each connection
pub type ConnectionId = Uuid;

/// Latest control state for one connection. Written by the session, read (not drained) by
/// the world each tick, so the most recent write always wins.
pub type ControlSlot = Arc<Mutex<Controls>>;

/// Turning input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Turning {
    #[default]
    None,
    Left,
    Right,
}

impl TryFrom<u8> for Turning {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Turning::None),
            1 => Ok(Turning::Left),
            2 => Ok(Turning::Right),
            _ => Err(ProtocolError::OutOfRange {
                field: "turning",
                value,
            }),
        }
    }
}

/// Control state applied to an entity for a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub thrust: bool,
    pub turning: Turning,
    pub attack: bool,
}

/// Events from the transport layer to the world task
#[derive(Debug)]
pub enum SessionEvent {
    Connected {
        conn_id: ConnectionId,
        controls: ControlSlot,
    },
    Request {
        conn_id: ConnectionId,
        msg: ClientMsg,
    },
    Disconnected {
        conn_id: ConnectionId,
    },
}

/// Outbound side of the transport. Delivery is fire-and-forget and must never block a tick.
pub trait Outbound: Send + Sync {
    fn send(&self, conn_id: ConnectionId, msg: &ServerMsg);

    /// Deliver to every connection; returns the serialized size in bytes
    fn broadcast(&self, msg: &ServerMsg) -> usize;
}
