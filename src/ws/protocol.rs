//! WebSocket protocol message definitions
//! JSON objects tagged by `action`

use serde::{Deserialize, Serialize};

use crate::game::{Controls, EntityId, EntityType, Turning};
use crate::geometry::{Polygon, Vec2};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Latest control state; omitted fields keep their previous value
    Controls { controls: ControlsUpdate },

    /// Set the display name
    Name { name: String },

    /// Request the player's own info
    Player,

    /// Request a custom collision shape
    Collide { size: CollideSize },
}

/// Raw control fields as sent on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlsUpdate {
    #[serde(default)]
    pub thrust: Option<u8>,
    #[serde(default)]
    pub turning: Option<u8>,
    #[serde(default)]
    pub attack: Option<u8>,
}

impl ControlsUpdate {
    /// Merge into `current`. Any out-of-range field rejects the whole update.
    pub fn apply_to(&self, current: &Controls) -> Result<Controls, ProtocolError> {
        let thrust = match self.thrust {
            Some(value) => flag("thrust", value)?,
            None => current.thrust,
        };
        let turning = match self.turning {
            Some(value) => Turning::try_from(value)?,
            None => current.turning,
        };
        let attack = match self.attack {
            Some(value) => flag("attack", value)?,
            None => current.attack,
        };

        Ok(Controls {
            thrust,
            turning,
            attack,
        })
    }
}

fn flag(field: &'static str, value: u8) -> Result<bool, ProtocolError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ProtocolError::OutOfRange { field, value }),
    }
}

/// Absorbs rounding in the hull re-centring so an exact minimum box is still accepted
const PERIMETER_TOLERANCE: f32 = 1e-3;

/// Requested collision shape: a square side, or a point cloud whose hull is used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollideSize {
    Side(f32),
    Points(Vec<[f32; 2]>),
}

impl CollideSize {
    /// Build the shape, rejecting anything with a perimeter outside
    /// `min_perimeter..=max_perimeter`
    pub fn to_polygon(
        &self,
        min_perimeter: f32,
        max_perimeter: f32,
    ) -> Result<Polygon, ProtocolError> {
        let polygon = match self {
            CollideSize::Side(side) if side.is_finite() && *side > 0.0 => Polygon::square(*side),
            CollideSize::Side(_) => return Err(ProtocolError::DegenerateShape),
            CollideSize::Points(points) => {
                if points.iter().flatten().any(|v| !v.is_finite()) {
                    return Err(ProtocolError::DegenerateShape);
                }
                let points: Vec<Vec2> = points.iter().map(|&p| Vec2::from(p)).collect();
                Polygon::from_points(&points)
            }
        };

        // Huge finite input can still overflow the hull and centroid arithmetic
        if polygon.vertices().len() < 3 || !polygon.vertices().iter().all(|v| v.is_finite()) {
            return Err(ProtocolError::DegenerateShape);
        }

        let perimeter = polygon.perimeter();
        if !perimeter.is_finite() || !polygon.nominal_radius().is_finite() {
            return Err(ProtocolError::DegenerateShape);
        }
        if perimeter < min_perimeter - PERIMETER_TOLERANCE {
            return Err(ProtocolError::ShapeTooSmall {
                perimeter,
                minimum: min_perimeter,
            });
        }
        if perimeter > max_perimeter + PERIMETER_TOLERANCE {
            return Err(ProtocolError::ShapeTooLarge {
                perimeter,
                maximum: max_perimeter,
            });
        }

        Ok(polygon)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Every live entity, once per tick
    Update { updates: Vec<EntitySnapshot> },

    /// An entity left the world
    Delete { object_id: EntityId },

    /// Reply to a player info request
    Player { info: EntityInfo },
}

/// Per-entity state broadcast each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub object_id: EntityId,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub pos_x: f32,
    pub pos_y: f32,
    pub angle: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub vel_angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: EntityId,
    pub health: i32,
    pub max_health: i32,
    pub turn_rate: f32,
    pub accel: f32,
    pub max_speed: f32,
    pub collide_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileInfo {
    pub id: EntityId,
    pub damage: i32,
    pub turn_rate: f32,
    pub accel: f32,
    pub max_speed: f32,
    pub collide_size: f32,
}

/// Kind-specific info payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityInfo {
    Player(PlayerInfo),
    Projectile(ProjectileInfo),
}

/// Reasons an inbound message is dropped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u8 },

    #[error("collision shape has no area")]
    DegenerateShape,

    #[error("collision shape perimeter {perimeter} below minimum {minimum}")]
    ShapeTooSmall { perimeter: f32, minimum: f32 },

    #[error("collision shape perimeter {perimeter} above maximum {maximum}")]
    ShapeTooLarge { perimeter: f32, maximum: f32 },
}

pub fn parse_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
