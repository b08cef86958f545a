//! Authoritative world state and the per-tick pipeline

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::{Config, PlanetConfig};
use crate::geometry::Vec2;
use crate::ws::protocol::{ClientMsg, EntitySnapshot, ProtocolError, ServerMsg};

use super::combat::{HitResult, WeaponStats};
use super::entity::{Entity, EntityId, Membership, WorldMutator};
use super::physics::{Arena, ShipStats};
use super::{ConnectionId, ControlSlot, Outbound, SessionEvent};

/// Tunables fixed for the lifetime of a world
#[derive(Debug, Clone)]
pub struct WorldRules {
    pub ship: ShipStats,
    pub weapon: WeaponStats,
    pub arena: Option<Arena>,
    pub planet: Option<PlanetConfig>,
    /// Smallest accepted perimeter for a custom collision shape
    pub min_collide_perimeter: f32,
    /// Largest accepted perimeter for a custom collision shape
    pub max_collide_perimeter: f32,
}

/// A 500-unit box
const MAX_COLLIDE_PERIMETER: f32 = 2_000.0;

impl Default for WorldRules {
    fn default() -> Self {
        let ship = ShipStats::default();
        Self {
            min_collide_perimeter: 4.0 * ship.collide_size,
            max_collide_perimeter: MAX_COLLIDE_PERIMETER,
            ship,
            weapon: WeaponStats::default(),
            arena: None,
            planet: None,
        }
    }
}

impl WorldRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            arena: config.arena_size.map(Arena::new),
            planet: config.planet,
            ..Self::default()
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub hits: Vec<HitResult>,
    /// Entities in the update broadcast
    pub snapshots: usize,
    /// Serialized size of the update broadcast
    pub update_bytes: usize,
    pub removed: Vec<EntityId>,
}

/// Mutations requested while entities update, applied by the world between entities
#[derive(Debug, Default)]
struct Pending {
    next_id: EntityId,
    spawned: Vec<(Entity, Membership)>,
    removals: Vec<EntityId>,
}

impl WorldMutator for Pending {
    fn new_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn add_entity(&mut self, entity: Entity, membership: Membership) {
        self.spawned.push((entity, membership));
    }

    fn remove_entity(&mut self, id: EntityId) {
        if !self.removals.contains(&id) {
            self.removals.push(id);
        }
    }
}

/// World state (owned by the world task)
pub struct World {
    /// Live entities in id order
    entities: Vec<Entity>,
    collidables: Vec<EntityId>,
    colliders: Vec<EntityId>,
    players: HashMap<ConnectionId, EntityId>,
    controls: HashMap<ConnectionId, ControlSlot>,
    pending: Pending,
    rules: WorldRules,
    tick: u64,
}

impl World {
    pub fn new(rules: WorldRules) -> Self {
        let mut world = Self {
            entities: Vec::new(),
            collidables: Vec::new(),
            colliders: Vec::new(),
            players: HashMap::new(),
            controls: HashMap::new(),
            pending: Pending::default(),
            rules,
            tick: 0,
        };

        if let Some(planet) = world.rules.planet {
            let id = world.new_id();
            let membership = if planet.damage > 0 {
                Membership::COLLIDER
            } else {
                Membership::NONE
            };
            let entity = Entity::planet(id, Vec2::new(planet.x, planet.y), planet.size, planet.damage);
            world.add_entity(entity, membership);
            info!(entity_id = id, x = planet.x, y = planet.y, size = planet.size, "Planet placed");
        }

        world
    }

    pub fn rules(&self) -> &WorldRules {
        &self.rules
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn client_count(&self) -> usize {
        self.players.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|index| &self.entities[index])
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(|index| &mut self.entities[index])
    }

    pub fn player_id(&self, conn_id: ConnectionId) -> Option<EntityId> {
        self.players.get(&conn_id).copied()
    }

    pub fn membership(&self, id: EntityId) -> Membership {
        Membership {
            collidable: self.collidables.contains(&id),
            collider: self.colliders.contains(&id),
        }
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    fn is_pending_removal(&self, id: EntityId) -> bool {
        self.pending.removals.contains(&id)
    }

    /// Spawn a player for a new connection
    pub fn connect(&mut self, conn_id: ConnectionId, controls: ControlSlot) -> EntityId {
        if let Some(id) = self.player_id(conn_id) {
            return id;
        }

        let id = self.new_id();
        let player = Entity::player(id, &self.rules.ship, self.rules.weapon);
        self.add_entity(player, Membership::COLLIDABLE);
        self.players.insert(conn_id, id);
        self.controls.insert(conn_id, controls);

        info!(conn_id = %conn_id, entity_id = id, "Player joined");
        id
    }

    /// Detach a connection; its player leaves during this tick's housekeeping
    pub fn disconnect(&mut self, conn_id: ConnectionId) -> Option<EntityId> {
        self.controls.remove(&conn_id);
        let id = self.players.remove(&conn_id)?;
        self.pending.remove_entity(id);

        info!(conn_id = %conn_id, entity_id = id, "Player left");
        Some(id)
    }

    pub fn handle_request(
        &mut self,
        conn_id: ConnectionId,
        msg: ClientMsg,
        out: &dyn Outbound,
    ) -> Result<(), ProtocolError> {
        let Some(id) = self.player_id(conn_id) else {
            return Ok(());
        };

        match msg {
            ClientMsg::Controls { controls } => {
                if let Some(slot) = self.controls.get(&conn_id) {
                    let mut current = slot.lock();
                    *current = controls.apply_to(&current)?;
                }
            }
            ClientMsg::Name { name } => {
                if let Some(player) = self.entity_mut(id) {
                    player.set_name(&name);
                    debug!(entity_id = id, name = %player.name, "Player renamed");
                }
            }
            ClientMsg::Player => {
                if let Some(info) = self.entity(id).and_then(Entity::info) {
                    out.send(conn_id, &ServerMsg::Player { info });
                }
            }
            ClientMsg::Collide { size } => {
                let shape = size.to_polygon(
                    self.rules.min_collide_perimeter,
                    self.rules.max_collide_perimeter,
                )?;
                if let Some(player) = self.entity_mut(id) {
                    player.set_shape(shape);
                    debug!(entity_id = id, collide_size = player.collide_size(), "Collision shape changed");
                }
            }
        }

        Ok(())
    }

    pub fn apply_event(&mut self, event: SessionEvent, out: &dyn Outbound) {
        match event {
            SessionEvent::Connected { conn_id, controls } => {
                self.connect(conn_id, controls);
            }
            SessionEvent::Request { conn_id, msg } => {
                if let Err(e) = self.handle_request(conn_id, msg, out) {
                    debug!(conn_id = %conn_id, error = %e, "Dropping request");
                }
            }
            SessionEvent::Disconnected { conn_id } => {
                self.disconnect(conn_id);
            }
        }
    }

    /// Run one tick: collisions on pre-tick state, entity updates, the update broadcast,
    /// then removals with one delete each
    pub fn tick(&mut self, dt: f32, out: &dyn Outbound) -> TickReport {
        self.tick += 1;
        self.pull_controls();

        let hits = self.collision_pass();
        let updates = self.update_entities(dt);
        let snapshots = updates.len();
        let update_bytes = out.broadcast(&ServerMsg::Update { updates });
        let removed = self.housekeeping(out);

        TickReport {
            tick: self.tick,
            hits,
            snapshots,
            update_bytes,
            removed,
        }
    }

    /// Latest control state for every player; read, not drained
    fn pull_controls(&mut self) {
        for (conn_id, slot) in &self.controls {
            let Some(&id) = self.players.get(conn_id) else {
                continue;
            };
            let controls = *slot.lock();
            if let Some(index) = self.index_of(id) {
                self.entities[index].controls = controls;
            }
        }
    }

    fn collision_pass(&mut self) -> Vec<HitResult> {
        let mut hits = Vec::new();

        for &collider_id in &self.colliders {
            if self.is_pending_removal(collider_id) {
                continue;
            }
            let Some(c) = self.index_of(collider_id) else {
                continue;
            };

            for &target_id in &self.collidables {
                // One hit per projectile per pass
                if self.entities[c].is_spent() {
                    break;
                }
                if target_id == collider_id || self.is_pending_removal(target_id) {
                    continue;
                }
                let Some(t) = self.index_of(target_id) else {
                    continue;
                };
                if !self.entities[t].test_collision(&self.entities[c]) {
                    continue;
                }

                let damage = self.entities[c].damage().unwrap_or(0);
                let target_reset = self.entities[t].take_hit(damage);
                self.entities[c].on_hit();

                debug!(collider_id, target_id, damage, "Hit");
                if target_reset {
                    info!(entity_id = target_id, "Player destroyed, respawning");
                }
                hits.push(HitResult {
                    collider_id,
                    target_id,
                    damage,
                    target_reset,
                });
            }
        }

        hits
    }

    fn update_entities(&mut self, dt: f32) -> Vec<EntitySnapshot> {
        let mut updates = Vec::with_capacity(self.entities.len());

        // Entities spawned along the way are appended and picked up by this same loop
        let mut i = 0;
        while i < self.entities.len() {
            let id = self.entities[i].id;
            if !self.is_pending_removal(id) {
                let arena = self.rules.arena;
                if let Some(snapshot) = self.entities[i].update(dt, &mut self.pending, arena.as_ref()) {
                    updates.push(snapshot);
                }
                for (entity, membership) in std::mem::take(&mut self.pending.spawned) {
                    self.add_entity(entity, membership);
                }
            }
            i += 1;
        }

        updates
    }

    fn housekeeping(&mut self, out: &dyn Outbound) -> Vec<EntityId> {
        let mut removed = std::mem::take(&mut self.pending.removals);
        removed.retain(|&id| self.detach(id));

        for &id in &removed {
            out.broadcast(&ServerMsg::Delete { object_id: id });
        }
        removed
    }

    fn detach(&mut self, id: EntityId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let entity = self.entities.remove(index);
        self.collidables.retain(|&other| other != id);
        self.colliders.retain(|&other| other != id);
        for other in &mut self.entities {
            other.forget(id);
        }

        debug!(entity_id = id, kind = ?entity.kind(), "Entity removed");
        true
    }
}

impl WorldMutator for World {
    fn new_id(&mut self) -> EntityId {
        self.pending.new_id()
    }

    fn add_entity(&mut self, entity: Entity, membership: Membership) {
        let id = entity.id;
        if membership.collidable {
            self.collidables.push(id);
        }
        if membership.collider {
            self.colliders.push(id);
        }
        let at = self.entities.partition_point(|e| e.id < id);
        self.entities.insert(at, entity);
    }

    fn remove_entity(&mut self, id: EntityId) {
        self.pending.remove_entity(id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::game::entity::{EntityType, Role};
    use crate::game::testing::RecordingOutbound;
    use crate::game::Controls;
    use crate::ws::protocol::{CollideSize, ControlsUpdate, EntityInfo};

    const DT: f32 = 1.0 / 30.0;

    fn join(world: &mut World) -> (ConnectionId, ControlSlot, EntityId) {
        let conn_id = Uuid::new_v4();
        let slot: ControlSlot = Arc::new(Mutex::new(Controls::default()));
        let id = world.connect(conn_id, slot.clone());
        (conn_id, slot, id)
    }

    fn last_update(out: &RecordingOutbound) -> Vec<EntitySnapshot> {
        out.take_broadcasts()
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMsg::Update { updates } => Some(updates),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }

    fn set_health(world: &mut World, id: EntityId, health: i32) {
        if let Some(Role::Player(player)) = world.entity_mut(id).map(|e| &mut e.role) {
            player.health = health;
        }
    }

    fn place(world: &mut World, id: EntityId, position: Vec2) {
        let entity = world.entity_mut(id).unwrap();
        entity.motion.position = position;
        let shape = entity.shape().clone();
        entity.set_shape(shape);
    }

    fn aim(world: &mut World, id: EntityId, position: Vec2, orientation: f32) {
        world.entity_mut(id).unwrap().motion.orientation = orientation;
        place(world, id, position);
    }

    fn projectile_owners(world: &World) -> HashMap<EntityId, EntityId> {
        world
            .entities()
            .iter()
            .filter_map(|e| match &e.role {
                Role::Projectile(state) => Some((e.id, state.owner)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_spawns_collidable_player() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, _, a) = join(&mut world);
        let (_, _, b) = join(&mut world);

        assert!(b > a);
        assert_eq!(world.client_count(), 2);
        assert_eq!(world.membership(a), Membership::COLLIDABLE);

        world.tick(DT, &out);
        let updates = last_update(&out);
        let ids: Vec<_> = updates.iter().map(|s| s.object_id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(updates.iter().all(|s| s.kind == EntityType::Player));
    }

    #[test]
    fn test_disconnect_removes_player_and_broadcasts_delete() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (conn, _, a) = join(&mut world);
        let (_, _, b) = join(&mut world);

        assert_eq!(world.disconnect(conn), Some(a));
        let report = world.tick(DT, &out);

        let broadcasts = out.take_broadcasts();
        let ServerMsg::Update { updates } = &broadcasts[0] else {
            panic!("update first");
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].object_id, b);
        assert_eq!(broadcasts[1], ServerMsg::Delete { object_id: a });
        assert_eq!(report.removed, vec![a]);
        assert!(world.entity(a).is_none());
        assert_eq!(world.client_count(), 1);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (conn, _, a) = join(&mut world);
        world.disconnect(conn);
        world.tick(DT, &out);

        let (_, _, b) = join(&mut world);
        assert!(b > a);
    }

    #[test]
    fn test_latest_controls_are_pulled_each_tick() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, slot, id) = join(&mut world);

        slot.lock().thrust = true;
        world.tick(DT, &out);
        world.tick(DT, &out);
        let moving = world.entity(id).unwrap().motion.velocity;
        assert!(moving.y > 0.0);

        // Slot is read, not drained: thrust persists until overwritten
        assert!(slot.lock().thrust);
        slot.lock().thrust = false;
        world.tick(DT, &out);
        assert_eq!(world.entity(id).unwrap().motion.velocity, moving);
    }

    #[test]
    fn test_projectile_snapshotted_in_spawn_tick() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, slot, id) = join(&mut world);
        slot.lock().attack = true;

        for _ in 0..40 {
            world.tick(DT, &out);
            let updates = last_update(&out);
            if updates.len() == 2 {
                assert_eq!(updates[0].object_id, id);
                assert_eq!(updates[1].kind, EntityType::Projectile);
                assert!(updates[1].object_id > id);
                assert_eq!(world.membership(updates[1].object_id), Membership::COLLIDER);
                return;
            }
        }
        panic!("no projectile fired");
    }

    #[test]
    fn test_projectile_hit_damages_and_expires() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, slot, shooter) = join(&mut world);
        let (_, _, target) = join(&mut world);
        place(&mut world, target, Vec2::new(0.0, 30.0));
        slot.lock().attack = true;

        let report = (0..90)
            .map(|_| world.tick(DT, &out))
            .find(|report| !report.hits.is_empty())
            .expect("projectile should reach the target");

        let hit = &report.hits[0];
        assert_eq!(hit.target_id, target);
        assert_eq!(hit.damage, 2);
        assert!(!hit.target_reset);
        assert_eq!(world.entity(target).unwrap().health(), Some(8));
        assert_eq!(world.entity(shooter).unwrap().health(), Some(10));

        // Force-expired in the pass, removed by the housekeeping of the same tick
        assert!(report.removed.contains(&hit.collider_id));
        assert!(out
            .take_broadcasts()
            .contains(&ServerMsg::Delete { object_id: hit.collider_id }));
        assert!(world.entity(hit.collider_id).is_none());
        assert!(!world.entity(shooter).unwrap().ignores(hit.collider_id));
    }

    #[test]
    fn test_lethal_hit_resets_target() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, slot, _) = join(&mut world);
        let (_, _, target) = join(&mut world);
        place(&mut world, target, Vec2::new(0.0, 30.0));
        set_health(&mut world, target, 2);
        slot.lock().attack = true;

        for _ in 0..90 {
            let report = world.tick(DT, &out);
            if !report.hits.is_empty() {
                assert!(report.hits[0].target_reset);
                let target = world.entity(target).unwrap();
                assert_eq!(target.health(), Some(10));
                assert_eq!(target.motion.position, Vec2::ZERO);
                return;
            }
        }
        panic!("no hit");
    }

    #[test]
    fn test_one_hit_per_projectile_per_pass() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, slot, _) = join(&mut world);
        let (_, _, first) = join(&mut world);
        let (_, _, second) = join(&mut world);
        place(&mut world, first, Vec2::new(0.0, 30.0));
        place(&mut world, second, Vec2::new(0.0, 30.0));
        slot.lock().attack = true;

        for _ in 0..90 {
            let report = world.tick(DT, &out);
            if !report.hits.is_empty() {
                assert_eq!(report.hits.len(), 1);
                assert_eq!(world.entity(first).unwrap().health(), Some(8));
                assert_eq!(world.entity(second).unwrap().health(), Some(10));
                return;
            }
        }
        panic!("no hit");
    }

    #[test]
    fn test_projectiles_outlive_their_owner() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (conn, slot, owner) = join(&mut world);
        slot.lock().attack = true;

        let projectile = loop {
            world.tick(DT, &out);
            if let Some(p) = world.entities().iter().find(|e| e.kind() == EntityType::Projectile) {
                break p.id;
            }
            assert!(world.tick_count() < 60);
        };

        world.disconnect(conn);
        world.tick(DT, &out);
        assert!(world.entity(owner).is_none());
        assert!(world.entity(projectile).is_some());
    }

    #[test]
    fn test_planet_hurts_every_overlapping_tick() {
        let rules = WorldRules {
            planet: Some(PlanetConfig {
                x: 0.0,
                y: 0.0,
                size: 50.0,
                damage: 1,
            }),
            ..WorldRules::default()
        };
        let mut world = World::new(rules);
        let out = RecordingOutbound::default();
        assert_eq!(world.membership(1), Membership::COLLIDER);

        let (_, _, id) = join(&mut world);
        world.tick(DT, &out);
        assert_eq!(world.entity(id).unwrap().health(), Some(9));
        let report = world.tick(DT, &out);
        assert_eq!(world.entity(id).unwrap().health(), Some(8));
        assert_eq!(report.hits[0].collider_id, 1);
        assert!(world.entity(1).is_some());
    }

    #[test]
    fn test_requests() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (conn, slot, id) = join(&mut world);

        world
            .handle_request(conn, ClientMsg::Name { name: "Goose".into() }, &out)
            .unwrap();
        assert_eq!(world.entity(id).unwrap().name, "Goose");

        world.handle_request(conn, ClientMsg::Player, &out).unwrap();
        let sent = out.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, conn);
        let ServerMsg::Player {
            info: EntityInfo::Player(info),
        } = &sent[0].1
        else {
            panic!("player info expected");
        };
        assert_eq!(info.id, id);

        world
            .handle_request(
                conn,
                ClientMsg::Controls {
                    controls: ControlsUpdate {
                        thrust: Some(1),
                        ..ControlsUpdate::default()
                    },
                },
                &out,
            )
            .unwrap();
        assert!(slot.lock().thrust);
    }

    #[test]
    fn test_collide_request_threshold() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (conn, _, id) = join(&mut world);

        let small = ClientMsg::Collide {
            size: CollideSize::Side(5.0),
        };
        assert!(world.handle_request(conn, small, &out).is_err());
        let before = world.entity(id).unwrap().collide_size();
        assert!((before - 10.0).abs() < 1e-3);

        let big = ClientMsg::Collide {
            size: CollideSize::Side(20.0),
        };
        world.handle_request(conn, big, &out).unwrap();
        assert!((world.entity(id).unwrap().collide_size() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_arena_wraps_players() {
        let rules = WorldRules {
            arena: Some(Arena::new(100.0)),
            ..WorldRules::default()
        };
        let mut world = World::new(rules);
        let out = RecordingOutbound::default();
        let (_, _, id) = join(&mut world);
        world.entity_mut(id).unwrap().motion.position = Vec2::new(0.0, 49.9);
        world.entity_mut(id).unwrap().motion.velocity = Vec2::new(0.0, 30.0);

        world.tick(DT, &out);
        assert!(world.entity(id).unwrap().motion.position.y < 0.0);
    }

    #[test]
    fn test_three_hits_with_lethal_last() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, light_slot, _) = join(&mut world);
        let (_, heavy_slot, heavy) = join(&mut world);
        let (_, _, target) = join(&mut world);
        place(&mut world, target, Vec2::new(0.0, 30.0));
        // Fires down onto the target from above
        aim(&mut world, heavy, Vec2::new(0.0, 60.0), 180.0);
        if let Role::Player(player) = &mut world.entity_mut(heavy).unwrap().role {
            player.weapon.damage = 6;
        }
        light_slot.lock().attack = true;

        let mut hits = Vec::new();
        for _ in 0..300 {
            let report = world.tick(DT, &out);
            for hit in report.hits {
                hits.push(hit);
                let target = world.entity(target).unwrap();
                match hits.len() {
                    1 => assert_eq!(target.health(), Some(8)),
                    2 => {
                        assert_eq!(target.health(), Some(6));
                        light_slot.lock().attack = false;
                        heavy_slot.lock().attack = true;
                    }
                    _ => {}
                }
            }
            if hits.len() == 3 {
                break;
            }
        }

        assert_eq!(hits.len(), 3);
        assert!(hits[..2].iter().all(|hit| hit.damage == 2 && !hit.target_reset));
        assert_eq!(hits[2].damage, 6);
        assert!(hits[2].target_reset);
        let target = world.entity(target).unwrap();
        assert_eq!(target.health(), Some(10));
        assert_eq!(target.motion.position, Vec2::ZERO);
        assert_eq!(target.motion.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_exchanged_fire_hits_once_per_projectile() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, low_slot, low) = join(&mut world);
        let (_, high_slot, high) = join(&mut world);
        aim(&mut world, high, Vec2::new(0.0, 60.0), 180.0);
        low_slot.lock().attack = true;
        high_slot.lock().attack = true;

        let mut taken: HashMap<EntityId, i32> = HashMap::new();
        for _ in 0..300 {
            let owners = projectile_owners(&world);
            let report = world.tick(DT, &out);

            let mut colliders: Vec<_> = report.hits.iter().map(|hit| hit.collider_id).collect();
            colliders.sort_unstable();
            colliders.dedup();
            assert_eq!(colliders.len(), report.hits.len());

            for hit in &report.hits {
                let owner = owners[&hit.collider_id];
                assert_ne!(owner, hit.target_id);
                assert_eq!(hit.target_id, if owner == low { high } else { low });
                *taken.entry(hit.target_id).or_default() += 1;
            }
            for id in [low, high] {
                let count = taken.get(&id).copied().unwrap_or(0);
                assert_eq!(world.entity(id).unwrap().health(), Some(10 - 2 * count));
            }
            if taken.values().filter(|&&count| count >= 2).count() == 2 {
                return;
            }
        }
        panic!("expected two hits on each player, got {taken:?}");
    }

    #[test]
    fn test_overflowing_collide_request_keeps_player_hittable() {
        let mut world = World::new(WorldRules::default());
        let out = RecordingOutbound::default();
        let (_, slot, _) = join(&mut world);
        let (conn, _, target) = join(&mut world);
        place(&mut world, target, Vec2::new(0.0, 30.0));

        let huge = ClientMsg::Collide {
            size: CollideSize::Side(1e19),
        };
        assert_eq!(
            world.handle_request(conn, huge, &out),
            Err(ProtocolError::DegenerateShape)
        );
        let oversized = ClientMsg::Collide {
            size: CollideSize::Side(1000.0),
        };
        assert!(matches!(
            world.handle_request(conn, oversized, &out),
            Err(ProtocolError::ShapeTooLarge { .. })
        ));
        let size = world.entity(target).unwrap().collide_size();
        assert!((size - 10.0).abs() < 1e-3);

        slot.lock().attack = true;
        let hit = (0..90)
            .flat_map(|_| world.tick(DT, &out).hits)
            .find(|hit| hit.target_id == target);
        assert!(hit.is_some());
        assert_eq!(world.entity(target).unwrap().health(), Some(8));
    }
}
