//! Procedural world generation
//!
//! Runs once before the first tick. Every placement is checked against an
//! occupancy quadtree that grows as objects are placed, so clusters never
//! stack two objects on the same cell.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::game::constants::{generation as consts, spatial, world as world_consts};
use crate::game::engine::{world_rect, World};
use crate::game::entity::{DataNode, Entity, Meteorite, OreTier, SpaceStation, Wormhole};
use crate::game::placement::{is_occupied, random_empty_position};
use crate::game::spatial::{QuadTree, SpatialEntry};
use crate::util::vec2::Vec2;

/// Placement context: the world being filled and its occupancy index
struct Builder<'a> {
    world: &'a World,
    rng: &'a mut StdRng,
    occupancy: QuadTree,
    placed: usize,
}

impl Builder<'_> {
    fn place(&mut self, entity: Entity) {
        self.occupancy.insert(SpatialEntry::from(&entity));
        self.world.registry.insert_static(entity);
        self.placed += 1;
    }

    fn free(&self, pos: Vec2, size: u32) -> bool {
        !is_occupied(&[&self.occupancy], pos, size)
    }

    fn random_empty(&mut self, size: u32) -> Vec2 {
        random_empty_position(&mut *self.rng, &[&self.occupancy], size)
    }

    fn random_cell(&mut self) -> (i32, i32) {
        (
            self.rng.gen_range(0..world_consts::WIDTH as i32),
            self.rng.gen_range(0..world_consts::HEIGHT as i32),
        )
    }
}

/// 60 / 30 / 10 copper, silver, gold
pub fn roll_tier<R: Rng + ?Sized>(rng: &mut R) -> OreTier {
    let roll = rng.gen_range(0..100);
    if roll < consts::TIER_COPPER_BELOW {
        OreTier::Copper
    } else if roll < consts::TIER_SILVER_BELOW {
        OreTier::Silver
    } else {
        OreTier::Gold
    }
}

/// Standard normal sample (Box-Muller)
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn in_map(x: i32, y: i32) -> bool {
    x >= 0 && x < world_consts::WIDTH as i32 && y >= 0 && y < world_consts::HEIGHT as i32
}

fn cell_center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f64 + 0.5, y as f64 + 0.5)
}

/// Populate `world` with terrain, data nodes and landmarks; returns the object count
pub fn generate(world: &World, rng: &mut StdRng, config: &GenerationConfig) -> usize {
    let mut b = Builder {
        world,
        rng,
        occupancy: QuadTree::new(world_rect(), spatial::STATIC_CAPACITY),
        placed: 0,
    };

    for _ in 0..config.dispersed_clusters {
        let (cx, cy) = b.random_cell();
        dispersed_cluster(&mut b, cx, cy);
    }
    for _ in 0..config.ring_clusters {
        let (cx, cy) = b.random_cell();
        ring_cluster(&mut b, cx, cy);
    }
    debug!("Meteorite clusters placed: {}", b.placed);

    for _ in 0..config.data_nodes {
        let at = b.random_empty(1);
        b.place(Entity::DataNode(DataNode::new(world.next_id(), at)));
    }
    for _ in 0..config.large_meteorites {
        standalone_meteorite(&mut b, 2);
    }
    for _ in 0..config.huge_meteorites {
        standalone_meteorite(&mut b, 3);
    }

    for _ in 0..config.space_stations {
        let probe = SpaceStation::new(world.next_id(), Vec2::ZERO);
        let at = b.random_empty(probe.header.size);
        b.place(Entity::SpaceStation(SpaceStation::new(probe.header.id, at)));
    }
    let now = world.now_ms();
    for _ in 0..config.wormhole_pairs {
        let (a_id, b_id) = (world.next_id(), world.next_id());
        let size = Wormhole::new(a_id, Vec2::ZERO, None, now).header.size;
        let a_at = b.random_empty(size);
        b.place(Entity::Wormhole(Wormhole::new(a_id, a_at, Some(b_id), now)));
        let b_at = b.random_empty(size);
        b.place(Entity::Wormhole(Wormhole::new(b_id, b_at, Some(a_id), now)));
    }

    b.placed
}

/// Meteorites scattered around a centre with a normal spread
fn dispersed_cluster(b: &mut Builder<'_>, cx: i32, cy: i32) {
    let count = consts::DISPERSED_MIN_SIZE + b.rng.gen_range(0..consts::DISPERSED_EXTRA_SIZE);
    for _ in 0..count {
        let x = (cx as f64 + gaussian(&mut *b.rng) * consts::DISPERSED_SIGMA).round() as i32;
        let y = (cy as f64 + gaussian(&mut *b.rng) * consts::DISPERSED_SIGMA).round() as i32;
        if !in_map(x, y) {
            continue;
        }
        let at = cell_center(x, y);
        if !b.free(at, 1) {
            continue;
        }
        let tier = roll_tier(&mut *b.rng);
        let resource = b.rng.gen_bool(consts::DISPERSED_RESOURCE_CHANCE).then_some(tier);
        b.place(Entity::Meteorite(Meteorite::new(b.world.next_id(), at, resource)));
    }
}

/// Filled disc of meteorites whose interior may carry resources
fn ring_cluster(b: &mut Builder<'_>, cx: i32, cy: i32) {
    let radius = consts::RING_MIN_RADIUS + b.rng.gen_range(0..consts::RING_EXTRA_RADIUS);
    let r = radius as f64;
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            let (x, y) = (cx + dx, cy + dy);
            if !in_map(x, y) {
                continue;
            }
            let dist = ((dx * dx + dy * dy) as f64).sqrt();
            if dist > r + 0.5 {
                continue;
            }
            let at = cell_center(x, y);
            if !b.free(at, 1) {
                continue;
            }
            let interior = dist < r - consts::RING_INTERIOR_INSET;
            let rich = interior && b.rng.gen_bool(consts::RING_INTERIOR_RESOURCE_CHANCE);
            let tier = roll_tier(&mut *b.rng);
            b.place(Entity::Meteorite(Meteorite::new(b.world.next_id(), at, rich.then_some(tier))));
        }
    }
}

fn standalone_meteorite(b: &mut Builder<'_>, size: u32) {
    let at = b.random_empty(size);
    let health = size as f64 * consts::STANDALONE_HEALTH_PER_SIZE;
    b.place(Entity::Meteorite(Meteorite::large(b.world.next_id(), at, size, health)));
}
