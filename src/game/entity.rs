//! World entities: shared kinematic state plus a per-kind role

use serde::{Deserialize, Serialize};

use crate::geometry::{shapes_collide, Polygon, Vec2};
use crate::ws::protocol::{EntityInfo, EntitySnapshot, PlayerInfo, ProjectileInfo};

use super::combat::{CombatSystem, WeaponStats};
use super::physics::{Arena, Handling, Motion, PhysicsSystem, ShipStats};
use super::Controls;

/// Server-assigned, monotonically increasing, never reused
pub type EntityId = u64;

pub const DEFAULT_NAME: &str = "Observer";
pub const MAX_NAME_LEN: usize = 32;

/// Variant tag carried in snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Generic,
    Player,
    Projectile,
    Static,
}

/// Which collision subsets an entity joins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Membership {
    /// Can be hit
    pub collidable: bool,
    /// Can hit things
    pub collider: bool,
}

impl Membership {
    pub const NONE: Self = Self {
        collidable: false,
        collider: false,
    };
    pub const COLLIDABLE: Self = Self {
        collidable: true,
        collider: false,
    };
    pub const COLLIDER: Self = Self {
        collidable: false,
        collider: true,
    };
}

/// What an entity may ask of the world while it updates
pub trait WorldMutator {
    fn new_id(&mut self) -> EntityId;

    /// Register a new entity; it is updated and snapshotted in the current tick
    fn add_entity(&mut self, entity: Entity, membership: Membership);

    /// Request removal during the end-of-tick housekeeping
    fn remove_entity(&mut self, id: EntityId);
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub health: i32,
    pub max_health: i32,
    /// Seconds until the weapon can fire again
    pub cooldown: f32,
    pub weapon: WeaponStats,
    /// Own live projectiles
    pub ignore: Vec<EntityId>,
    pub spawn: Vec2,
}

#[derive(Debug, Clone)]
pub struct ProjectileState {
    pub owner: EntityId,
    pub damage: i32,
    /// Seconds left before expiry
    pub lifetime: f32,
}

#[derive(Debug, Clone)]
pub struct StaticState {
    /// Damage dealt to anything overlapping it, every tick
    pub damage: i32,
}

/// Kind-specific state and behavior
#[derive(Debug, Clone)]
pub enum Role {
    Generic,
    Player(PlayerState),
    Projectile(ProjectileState),
    Static(StaticState),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub role: Role,
    pub motion: Motion,
    pub handling: Handling,
    pub controls: Controls,
    shape: Polygon,
    collide_size: f32,
}

impl Entity {
    pub fn new(id: EntityId, role: Role, motion: Motion, handling: Handling, mut shape: Polygon) -> Self {
        shape.place(motion.position, motion.orientation);
        Self {
            id,
            name: DEFAULT_NAME.to_string(),
            role,
            motion,
            handling,
            controls: Controls::default(),
            collide_size: shape.nominal_radius(),
            shape,
        }
    }

    /// A fresh player at the spawn point with a full weapon cooldown
    pub fn player(id: EntityId, stats: &ShipStats, weapon: WeaponStats) -> Self {
        let spawn = Vec2::ZERO;
        let role = Role::Player(PlayerState {
            health: stats.max_health,
            max_health: stats.max_health,
            cooldown: weapon.cooldown,
            weapon,
            ignore: Vec::new(),
            spawn,
        });
        Self::new(
            id,
            role,
            Motion::at(spawn, 0.0),
            stats.handling,
            Polygon::square(stats.collide_size),
        )
    }

    /// Immovable hazard
    pub fn planet(id: EntityId, position: Vec2, size: f32, damage: i32) -> Self {
        let mut entity = Self::new(
            id,
            Role::Static(StaticState { damage }),
            Motion::at(position, 0.0),
            Handling::default(),
            Polygon::square(size),
        );
        entity.name = "Planet".to_string();
        entity
    }

    pub fn kind(&self) -> EntityType {
        match self.role {
            Role::Generic => EntityType::Generic,
            Role::Player(_) => EntityType::Player,
            Role::Projectile(_) => EntityType::Projectile,
            Role::Static(_) => EntityType::Static,
        }
    }

    pub fn shape(&self) -> &Polygon {
        &self.shape
    }

    /// Nominal collision radius of the current shape
    pub fn collide_size(&self) -> f32 {
        self.collide_size
    }

    pub fn set_shape(&mut self, mut shape: Polygon) {
        shape.place(self.motion.position, self.motion.orientation);
        self.collide_size = shape.nominal_radius();
        self.shape = shape;
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.chars().take(MAX_NAME_LEN).collect();
    }

    pub fn health(&self) -> Option<i32> {
        match &self.role {
            Role::Player(player) => Some(player.health),
            _ => None,
        }
    }

    /// Damage dealt when this entity hits something
    pub fn damage(&self) -> Option<i32> {
        match &self.role {
            Role::Projectile(projectile) => Some(projectile.damage),
            Role::Static(hazard) => Some(hazard.damage),
            _ => None,
        }
    }

    /// A projectile whose lifetime has run out
    pub fn is_spent(&self) -> bool {
        matches!(&self.role, Role::Projectile(p) if p.lifetime <= 0.0)
    }

    pub fn ignores(&self, other: EntityId) -> bool {
        match &self.role {
            Role::Player(player) => player.ignore.contains(&other),
            Role::Projectile(projectile) => projectile.owner == other,
            _ => false,
        }
    }

    /// Drop a removed entity from the ignore relation
    pub fn forget(&mut self, id: EntityId) {
        if let Role::Player(player) = &mut self.role {
            player.ignore.retain(|&ignored| ignored != id);
        }
    }

    /// Two-phase overlap test, short-circuited by the ignore relation in either direction
    pub fn test_collision(&self, other: &Entity) -> bool {
        if self.id == other.id || self.ignores(other.id) || other.ignores(self.id) {
            return false;
        }
        shapes_collide(&self.shape, self.collide_size, &other.shape, other.collide_size)
    }

    /// Hit handler for the target side. Returns true if the hit was lethal and the entity
    /// was reset.
    pub fn take_hit(&mut self, damage: i32) -> bool {
        let Role::Player(player) = &mut self.role else {
            return false;
        };

        let (health, lethal) = CombatSystem::apply_damage(player.health, damage);
        if !lethal {
            player.health = health;
            return false;
        }

        player.health = player.max_health;
        self.motion.stop_at(player.spawn);
        self.sync_shape();
        true
    }

    /// Hit handler for the collider side. Returns true if the collider is now spent.
    pub fn on_hit(&mut self) -> bool {
        match &mut self.role {
            Role::Projectile(projectile) => {
                projectile.lifetime = 0.0;
                true
            }
            _ => false,
        }
    }

    /// Per-tick update. Returns `None` once the entity has asked to be removed.
    pub fn update(
        &mut self,
        dt: f32,
        world: &mut dyn WorldMutator,
        arena: Option<&Arena>,
    ) -> Option<EntitySnapshot> {
        if matches!(self.role, Role::Static(_)) {
            return Some(self.snapshot());
        }

        match &mut self.role {
            Role::Player(player) => {
                if CombatSystem::can_fire(player.cooldown) && self.controls.attack {
                    let projectile =
                        CombatSystem::fire(world, self.id, &self.motion, &player.weapon, dt);
                    player.ignore.push(projectile.id);
                    player.cooldown = player.weapon.cooldown;
                    world.add_entity(projectile, Membership::COLLIDER);
                } else {
                    player.cooldown =
                        CombatSystem::recover_cooldown(player.cooldown, &player.weapon, dt);
                }
            }
            Role::Projectile(projectile) => {
                projectile.lifetime -= dt;
                if projectile.lifetime <= 0.0 {
                    world.remove_entity(self.id);
                    return None;
                }
            }
            Role::Static(_) | Role::Generic => {}
        }

        PhysicsSystem::integrate(&mut self.motion, &self.handling, &self.controls, dt, arena);
        self.sync_shape();
        Some(self.snapshot())
    }

    fn sync_shape(&mut self) {
        self.shape.place(self.motion.position, self.motion.orientation);
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            object_id: self.id,
            kind: self.kind(),
            pos_x: self.motion.position.x,
            pos_y: self.motion.position.y,
            angle: self.motion.orientation,
            vel_x: self.motion.velocity.x,
            vel_y: self.motion.velocity.y,
            vel_angle: self.motion.angular_velocity,
        }
    }

    pub fn info(&self) -> Option<EntityInfo> {
        match &self.role {
            Role::Player(player) => Some(EntityInfo::Player(PlayerInfo {
                id: self.id,
                health: player.health,
                max_health: player.max_health,
                turn_rate: self.handling.turn_rate,
                accel: self.handling.acceleration,
                max_speed: self.handling.max_speed,
                collide_size: self.collide_size,
            })),
            Role::Projectile(projectile) => Some(EntityInfo::Projectile(ProjectileInfo {
                id: self.id,
                damage: projectile.damage,
                turn_rate: self.handling.turn_rate,
                accel: self.handling.acceleration,
                max_speed: self.handling.max_speed,
                collide_size: self.collide_size,
            })),
            _ => None,
        }
    }
}
