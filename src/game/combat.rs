//! Combat system - weapons, firing, damage

use crate::geometry::{manhattan, Polygon};

use super::entity::{Entity, EntityId, ProjectileState, Role, WorldMutator};
use super::physics::{Handling, Motion};

/// Weapon constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Damage per hit
    pub damage: i32,
    /// Launch speed before the emitter's own speed is added
    pub base_speed: f32,
    /// Seconds between shots
    pub cooldown: f32,
    /// Cooldown recovered per second
    pub cooldown_recovery: f32,
    /// Projectile lifetime (seconds)
    pub lifetime: f32,
    /// Side of the projectile's square hull
    pub collide_size: f32,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            damage: 2,
            base_speed: 100.0,
            cooldown: 0.5,
            cooldown_recovery: 0.5,
            lifetime: 2.0,
            collide_size: 4.0,
        }
    }
}

/// Combat rules
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a weapon can fire (cooldown check)
    pub fn can_fire(cooldown: f32) -> bool {
        cooldown <= 0.0
    }

    /// Cooldown left after `dt` seconds; proportional to elapsed time, not tick count
    pub fn recover_cooldown(cooldown: f32, weapon: &WeaponStats, dt: f32) -> f32 {
        (cooldown - weapon.cooldown_recovery * dt).max(0.0)
    }

    /// Projectiles outrun whatever fired them
    pub fn launch_speed(weapon: &WeaponStats, emitter_speed: f32) -> f32 {
        weapon.base_speed + emitter_speed
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(health: i32, damage: i32) -> (i32, bool) {
        let health = health - damage;
        (health, health <= 0)
    }

    /// Build a projectile leaving `emitter` along its heading. It holds thrust and starts at
    /// its envelope velocity for `dt`, the step the current tick integrates with.
    pub fn fire(
        world: &mut dyn WorldMutator,
        owner: EntityId,
        emitter: &Motion,
        weapon: &WeaponStats,
        dt: f32,
    ) -> Entity {
        let handling = Handling {
            max_speed: Self::launch_speed(weapon, emitter.speed),
            ..Handling::default()
        };

        let mut motion = Motion::at(emitter.position, emitter.orientation);
        motion.velocity = motion.envelope(handling.acceleration * dt, handling.max_speed);
        motion.speed = manhattan(motion.velocity);

        let role = Role::Projectile(ProjectileState {
            owner,
            damage: weapon.damage,
            lifetime: weapon.lifetime,
        });

        let mut projectile = Entity::new(
            world.new_id(),
            role,
            motion,
            handling,
            Polygon::square(weapon.collide_size),
        );
        projectile.controls.thrust = true;
        projectile
    }
}

/// One collider hitting one target during a collision pass
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub collider_id: EntityId,
    pub target_id: EntityId,
    pub damage: i32,
    /// The hit was lethal and the target went back to its spawn
    pub target_reset: bool,
}
