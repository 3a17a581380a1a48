//! Tick engine
//!
//! [`World`] is the thread-safe half: registry, queues, clock and id source,
//! shared through an `Arc` with every connection handler. [`TickEngine`] is
//! the tick-thread half: it owns both quadtrees, its own seeded RNG and every
//! counter, and runs the fixed per-tick pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SimConfig;
use crate::game::constants::{palette, player as player_consts, spatial, world as world_consts};
use crate::game::entity::{EntityId, EntityKind, Player};
use crate::game::events::{EventQueues, VisualEffect};
use crate::game::placement;
use crate::game::registry::Registry;
use crate::game::spatial::{QuadTree, Rect, SpatialEntry};
use crate::game::systems::{ai, physics, projectile};
use crate::game::worldgen;
use crate::net::aoi;
use crate::net::protocol::Snapshot;
use crate::util::clock::Clock;
use crate::util::vec2::Vec2;

/// World rectangle shared by both indices
pub fn world_rect() -> Rect {
    Rect::new(
        world_consts::WIDTH / 2.0,
        world_consts::HEIGHT / 2.0,
        world_consts::WIDTH / 2.0,
        world_consts::HEIGHT / 2.0,
    )
}

// ============================================================================
// World (shared)
// ============================================================================

pub struct World {
    pub registry: Registry,
    pub events: EventQueues,
    clock: Arc<dyn Clock>,
    /// Randomness for connection-side actions (cosmetics, player weapon spread)
    rng: Mutex<StdRng>,
    next_id: AtomicU64,
}

impl World {
    pub fn new(seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Registry::new(),
            events: EventQueues::new(),
            clock,
            rng: Mutex::new(StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15)),
            next_id: AtomicU64::new(1),
        }
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Fresh id for a server-created entity; never collides with v4 player ids
    pub fn next_id(&self) -> EntityId {
        Uuid::from_u64_pair(0, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        f(&mut self.rng.lock())
    }

    /// `base`, or `base (n)` with the smallest free n, compared case-insensitively
    pub fn unique_name(&self, base: &str, exclude: Option<&EntityId>) -> String {
        let mut taken: Vec<String> = Vec::new();
        self.registry.players.for_each(|id, p| {
            if Some(id) != exclude {
                taken.push(p.header.name.to_lowercase());
            }
        });

        let is_taken = |candidate: &str| taken.iter().any(|t| *t == candidate.to_lowercase());
        let mut candidate = base.to_string();
        let mut n = 1;
        while is_taken(&candidate) {
            candidate = format!("{base} ({n})");
            n += 1;
        }
        candidate
    }

    /// Register a connecting player; the next tick places them on the map
    pub fn add_player(&self, id: EntityId, requested_name: &str) -> String {
        let base = sanitize_name(requested_name);
        let name = self.unique_name(&base, None);
        let (symbol, color) = self.with_rng(|rng| {
            (
                player_consts::SYMBOLS[rng.gen_range(0..player_consts::SYMBOLS.len())],
                player_consts::COLORS[rng.gen_range(0..player_consts::COLORS.len())],
            )
        });

        let mut player = Player::new(id, &name, symbol, color, Vec2::new(world_consts::WIDTH / 2.0, world_consts::HEIGHT / 2.0));
        player.respawn_at_ms = self.now_ms().max(1);

        self.events.register(id);
        self.registry.players.insert(id, player);
        self.events
            .global(format!("[{}]Agent {name} uplink established.", palette::INFO));
        info!("Player {} joined as '{}'", id, name);
        name
    }

    /// Remove a disconnecting player and their private queue
    pub fn remove_player(&self, id: &EntityId) -> bool {
        self.events.unregister(id);
        match self.registry.players.remove(id) {
            Some(player) => {
                self.events.global(format!(
                    "[{}]Agent {} connection lost.",
                    palette::ERROR,
                    player.header.name
                ));
                info!("Player {} ({}) left", id, player.header.name);
                true
            }
            None => false,
        }
    }

    pub fn player_count(&self) -> usize {
        self.registry.players.len()
    }
}

/// Trimmed, length-capped display name; falls back to "AGENT"
pub fn sanitize_name(raw: &str) -> String {
    let trimmed: String = raw.trim().chars().take(player_consts::MAX_NAME_LEN).collect();
    if trimmed.is_empty() {
        "AGENT".to_string()
    } else {
        trimmed
    }
}

// ============================================================================
// Sim (per-tick borrow bundle)
// ============================================================================

/// Everything a pipeline step may touch during one tick
pub struct Sim<'a> {
    pub world: &'a World,
    pub dynamic: &'a QuadTree,
    pub statics: &'a QuadTree,
    pub rng: &'a mut StdRng,
    pub now: u64,
}

impl<'a> Sim<'a> {
    /// Entries of both indices near `at`, with the large-footprint margin applied
    pub fn nearby(&self, at: Vec2, radius: f64) -> SmallVec<[SpatialEntry; 16]> {
        let range = radius + spatial::QUERY_MARGIN;
        let mut found = SmallVec::new();
        self.dynamic.query(at.x, at.y, range, range, |e| found.push(*e));
        self.statics.query(at.x, at.y, range, range, |e| found.push(*e));
        found
    }

    /// Solid terrain overlapping a `size` footprint at `pos`
    pub fn blocked(&self, pos: Vec2, size: u32) -> bool {
        let statics = self.world.registry.statics();
        placement::is_blocked_by_solid(self.statics, pos, size, |id| statics.contains_key(id))
    }

    pub fn random_empty_position(&mut self, size: u32) -> Vec2 {
        placement::random_empty_position(&mut *self.rng, &[self.dynamic, self.statics], size)
    }

    pub fn effect(&self, effect: VisualEffect) {
        self.world.events.effect(effect);
    }
}

// ============================================================================
// TickEngine (tick thread)
// ============================================================================

/// Counts observed at the end of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub players: usize,
    pub sentinels: usize,
    pub projectiles: usize,
    pub statics: usize,
    pub static_rebuilt: bool,
}

pub struct TickEngine {
    world: Arc<World>,
    dynamic_index: QuadTree,
    static_index: QuadTree,
    rng: StdRng,
    tick: u64,
    population: ai::Population,
}

impl TickEngine {
    /// Build the engine and populate the static world
    pub fn new(world: Arc<World>, config: &SimConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        worldgen::generate(&world, &mut rng, &config.generation);
        info!(
            "World generated: {} static objects (seed {})",
            world.registry.static_count(),
            config.seed
        );

        Self {
            world,
            dynamic_index: QuadTree::new(world_rect(), spatial::DYNAMIC_CAPACITY),
            static_index: QuadTree::new(world_rect(), spatial::STATIC_CAPACITY),
            rng,
            tick: 0,
            population: ai::Population::new(
                config.sentinels_per_player,
                config.null_interval_ms,
                config.fire_wall_interval_ms,
            ),
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn dynamic_index(&self) -> &QuadTree {
        &self.dynamic_index
    }

    pub fn static_index(&self) -> &QuadTree {
        &self.static_index
    }

    /// Run one full tick
    pub fn update(&mut self) -> TickReport {
        let now = self.world.now_ms();
        let tick = self.tick;

        self.rebuild_dynamic();
        let static_rebuilt = self.world.registry.take_static_dirty();
        if static_rebuilt {
            self.rebuild_static();
        }

        let mut sim = Sim {
            world: &self.world,
            dynamic: &self.dynamic_index,
            statics: &self.static_index,
            rng: &mut self.rng,
            now,
        };

        self.population.run(&mut sim, tick);
        physics::respawn_players(&mut sim);
        physics::apply_held_directions(&sim);
        ai::run_sentinels(&mut sim);
        physics::regenerate_shields(&mut sim);
        projectile::integrate(&mut sim);
        physics::integrate_players(&mut sim);

        self.tick += 1;

        let registry = &self.world.registry;
        TickReport {
            tick,
            players: registry.players.len(),
            sentinels: registry.sentinels.len(),
            projectiles: registry.projectiles.len(),
            statics: registry.static_count(),
            static_rebuilt,
        }
    }

    fn rebuild_dynamic(&mut self) {
        index_dynamic(&self.world, &mut self.dynamic_index);
    }

    /// Rebuild both indices without running the pipeline
    #[cfg(test)]
    pub(crate) fn reindex(&mut self) {
        self.rebuild_dynamic();
        self.world.registry.take_static_dirty();
        self.rebuild_static();
    }

    fn rebuild_static(&mut self) {
        index_statics(&self.world, &mut self.static_index);
        debug!("Static index rebuilt: {} entries", self.static_index.len());
    }

    /// Per-recipient view of the world after the last tick
    pub fn snapshot_for(&self, id: &EntityId, events: Vec<String>, effects: Vec<VisualEffect>) -> Option<Snapshot> {
        aoi::build_snapshot(self, id, events, effects)
    }

    /// Drain every queue once and build one snapshot per connected player
    pub fn broadcast(&mut self) -> Vec<(EntityId, Snapshot)> {
        let events = &self.world.events;
        let global = events.drain_global();
        let effects = events.drain_effects();

        let mut frames = Vec::new();
        for id in self.world.registry.players.keys() {
            let mut lines = global.clone();
            lines.extend(events.drain_private(&id));
            if let Some(snapshot) = self.snapshot_for(&id, lines, effects.clone()) {
                frames.push((id, snapshot));
            }
        }
        frames
    }
}

/// Refill `index` with every living player, sentinel and projectile
pub(crate) fn index_dynamic(world: &World, index: &mut QuadTree) {
    index.clear();
    let registry = &world.registry;
    registry.players.for_each(|id, p| {
        if p.is_alive() {
            index.insert(SpatialEntry::new(*id, EntityKind::Player, p.header.position, p.header.size));
        }
    });
    registry.sentinels.for_each(|id, s| {
        index.insert(SpatialEntry::new(*id, EntityKind::Sentinel, s.header.position, s.header.size));
    });
    registry.projectiles.for_each(|id, p| {
        index.insert(SpatialEntry::new(*id, EntityKind::Projectile, p.header.position, p.header.size));
    });
}

/// Refill `index` with every static object
pub(crate) fn index_statics(world: &World, index: &mut QuadTree) {
    index.clear();
    world.registry.statics().for_each(|_, e| {
        index.insert(SpatialEntry::from(e));
    });
}
