//! Kinematics: thrust within a speed envelope, turning, orientation and arena wrapping

use serde::{Deserialize, Serialize};

use crate::geometry::{manhattan, unit_vector, Vec2};

use super::{Controls, Turning};

/// Handling constants for anything that moves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Handling {
    /// Degrees per second
    pub turn_rate: f32,
    /// Units per second squared
    pub acceleration: f32,
    /// Manhattan speed cap
    pub max_speed: f32,
}

impl Default for Handling {
    fn default() -> Self {
        Self {
            turn_rate: 180.0,
            acceleration: 25.0,
            max_speed: 50.0,
        }
    }
}

/// Player ship constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipStats {
    pub handling: Handling,
    pub max_health: i32,
    /// Side of the default square hull; also its nominal collision radius
    pub collide_size: f32,
}

impl Default for ShipStats {
    fn default() -> Self {
        Self {
            handling: Handling::default(),
            max_health: 10,
            collide_size: 10.0,
        }
    }
}

/// Square arena centred on the origin. Leaving through one side re-enters from the opposite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub size: f32,
}

impl Arena {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn wrap(&self, position: Vec2) -> Vec2 {
        Vec2::new(self.wrap_axis(position.x), self.wrap_axis(position.y))
    }

    fn wrap_axis(&self, v: f32) -> f32 {
        let half = self.size / 2.0;
        if (-half..=half).contains(&v) {
            v
        } else {
            (v + half).rem_euclid(self.size) - half
        }
    }
}

/// Cached per-axis velocity envelope and the inputs it was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
struct Envelope {
    orientation: f32,
    step: f32,
    max_speed: f32,
    limit: Vec2,
}

/// Kinematic state of an entity
#[derive(Debug, Clone, Default)]
pub struct Motion {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Degrees in [0, 360); 0 points up
    pub orientation: f32,
    /// Degrees per second, positive counter-clockwise
    pub angular_velocity: f32,
    /// Manhattan magnitude of the velocity
    pub speed: f32,
    envelope: Option<Envelope>,
}

impl Motion {
    pub fn at(position: Vec2, orientation: f32) -> Self {
        Self {
            position,
            orientation: PhysicsSystem::normalize_orientation(orientation),
            ..Self::default()
        }
    }

    /// Back to rest at `position`, keeping the orientation
    pub fn stop_at(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.speed = 0.0;
    }

    /// Per-axis velocity limit for the current heading; only recomputed when the
    /// orientation, the per-tick step or the cap changes
    pub fn envelope(&mut self, step: f32, max_speed: f32) -> Vec2 {
        match self.envelope {
            Some(cached)
                if cached.orientation == self.orientation
                    && cached.step == step
                    && cached.max_speed == max_speed =>
            {
                cached.limit
            }
            _ => {
                let limit = PhysicsSystem::max_speed_envelope(self.orientation, step, max_speed);
                self.envelope = Some(Envelope {
                    orientation: self.orientation,
                    step,
                    max_speed,
                    limit,
                });
                limit
            }
        }
    }
}

/// Movement rules shared by every entity type
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Unit vector of travel for an orientation (0 degrees points up)
    pub fn heading(orientation: f32) -> Vec2 {
        unit_vector(orientation + 90.0)
    }

    /// Wrap into [0, 360)
    pub fn normalize_orientation(orientation: f32) -> f32 {
        let wrapped = orientation.rem_euclid(360.0);
        // rem_euclid rounds tiny negative inputs up to exactly 360
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    }

    /// First point along the heading, accumulated in steps of `step`, whose Manhattan
    /// magnitude reaches `max_speed`. A non-positive step never reaches it and yields zero.
    pub fn max_speed_envelope(orientation: f32, step: f32, max_speed: f32) -> Vec2 {
        if step <= 0.0 || max_speed <= 0.0 {
            return Vec2::ZERO;
        }

        let increment = Self::heading(orientation) * step;
        let mut limit = Vec2::ZERO;
        while manhattan(limit) < max_speed {
            limit = limit + increment;
        }
        limit
    }

    /// True while `candidate` has not reached the envelope `limit` on its axis
    fn within(candidate: f32, limit: f32) -> bool {
        if limit > 0.0 {
            candidate < limit
        } else {
            candidate > limit
        }
    }

    /// Advance one tick
    pub fn integrate(
        motion: &mut Motion,
        handling: &Handling,
        controls: &Controls,
        dt: f32,
        arena: Option<&Arena>,
    ) {
        let step = handling.acceleration * dt;

        if controls.thrust {
            let limit = motion.envelope(step, handling.max_speed);
            let candidate = motion.velocity + Self::heading(motion.orientation) * step;
            // Each axis is accepted or rejected on its own
            if Self::within(candidate.x, limit.x) {
                motion.velocity.x = candidate.x;
            }
            if Self::within(candidate.y, limit.y) {
                motion.velocity.y = candidate.y;
            }
        }

        motion.angular_velocity = match controls.turning {
            Turning::Left => handling.turn_rate,
            Turning::Right => -handling.turn_rate,
            Turning::None => 0.0,
        };

        motion.position = motion.position + motion.velocity * dt;
        motion.orientation =
            Self::normalize_orientation(motion.orientation + motion.angular_velocity * dt);

        if let Some(arena) = arena {
            motion.position = arena.wrap(motion.position);
        }

        motion.speed = manhattan(motion.velocity);
    }
}
