//! Test harness: a world with a manual clock and hand-rebuilt indices

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::game::engine::{index_dynamic, index_statics, world_rect, Sim, World};
use crate::game::entity::{Entity, EntityId, Meteorite, Player, Sentinel, SentinelKind};
use crate::game::spatial::QuadTree;
use crate::game::constants::spatial;
use crate::util::clock::{Clock, ManualClock};
use crate::util::vec2::Vec2;

pub struct TestWorld {
    pub world: Arc<World>,
    pub clock: ManualClock,
    pub dynamic: QuadTree,
    pub statics: QuadTree,
    pub rng: StdRng,
}

impl TestWorld {
    pub fn new() -> Self {
        let clock = ManualClock::new(100_000);
        Self {
            world: Arc::new(World::new(7, Arc::new(clock.clone()))),
            clock,
            dynamic: QuadTree::new(world_rect(), spatial::DYNAMIC_CAPACITY),
            statics: QuadTree::new(world_rect(), spatial::STATIC_CAPACITY),
            rng: StdRng::seed_from_u64(7),
        }
    }

    /// Insert an alive, already-placed player
    pub fn spawn_player(&self, name: &str, position: Vec2) -> EntityId {
        let id = uuid::Uuid::new_v4();
        self.world.events.register(id);
        self.world
            .registry
            .players
            .insert(id, Player::new(id, name, "[P]", "#58a6ff", position));
        id
    }

    pub fn spawn_sentinel(&self, kind: SentinelKind, position: Vec2) -> EntityId {
        let sentinel = Sentinel::new(self.world.next_id(), kind, position);
        let id = sentinel.header.id;
        self.world.registry.sentinels.insert(id, sentinel);
        id
    }

    pub fn add_static(&self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.world.registry.insert_static(entity);
        id
    }

    pub fn add_meteorite(&self, meteorite: Meteorite) -> EntityId {
        self.add_static(Entity::Meteorite(meteorite))
    }

    /// Rebuild both indices from the registry
    pub fn rebuild(&mut self) {
        index_dynamic(&self.world, &mut self.dynamic);
        index_statics(&self.world, &mut self.statics);
        self.world.registry.take_static_dirty();
    }

    pub fn with_sim<R>(&mut self, f: impl FnOnce(&mut Sim<'_>) -> R) -> R {
        let mut sim = Sim {
            world: &self.world,
            dynamic: &self.dynamic,
            statics: &self.statics,
            rng: &mut self.rng,
            now: self.clock.now_ms(),
        };
        f(&mut sim)
    }

    pub fn player(&self, id: &EntityId) -> Player {
        self.world
            .registry
            .players
            .get(id)
            .unwrap_or_else(|| panic!("player {id} missing"))
    }
}
