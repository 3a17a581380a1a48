//! Position validity, occupancy and random placement
//!
//! Shared by world generation (against its incremental static tree) and the
//! tick engine (against both live trees).

use rand::Rng;

use crate::game::constants::{generation, spatial, world};
use crate::game::entity::EntityKind;
use crate::game::spatial::QuadTree;
use crate::util::vec2::Vec2;

/// Whether a footprint of `size` fits: `half <= c < dimension - half` on both axes
pub fn is_valid_position(pos: Vec2, size: u32) -> bool {
    let half = size as f64 / 2.0;
    pos.x >= half && pos.x < world::WIDTH - half && pos.y >= half && pos.y < world::HEIGHT - half
}

/// Clamp one coordinate into the half-open interval accepted by `is_valid_position`
pub fn clamp_axis(value: f64, half: f64, dimension: f64) -> f64 {
    value.max(half).min(dimension - half - world::EDGE_EPSILON)
}

/// Any indexed object whose footprint overlaps a `size` footprint at `pos`
pub fn is_occupied(trees: &[&QuadTree], pos: Vec2, size: u32) -> bool {
    let half = size as f64 / 2.0;
    let range = half + generation::OCCUPANCY_CLEARANCE;
    trees.iter().any(|tree| {
        tree.find_first(pos.x, pos.y, range, range, |e| {
            let threshold = (e.size + size) as f64 / 2.0;
            (e.position.x - pos.x).abs() < threshold && (e.position.y - pos.y).abs() < threshold
        })
        .is_some()
    })
}

/// Solid terrain overlapping a `size` footprint at `pos`
///
/// `is_live` filters out index entries whose object was removed since the
/// last rebuild.
pub fn is_blocked_by_solid(statics: &QuadTree, pos: Vec2, size: u32, mut is_live: impl FnMut(&uuid::Uuid) -> bool) -> bool {
    let half = size as f64 / 2.0;
    let range = half + 1.0 + spatial::QUERY_MARGIN;
    statics
        .find_first(pos.x, pos.y, range, range, |e| {
            if e.kind != EntityKind::Meteorite {
                return false;
            }
            let threshold = half + e.half_size();
            (e.position.x - pos.x).abs() < threshold
                && (e.position.y - pos.y).abs() < threshold
                && is_live(&e.id)
        })
        .is_some()
}

/// Random position whose footprint fits the map, preferring unoccupied cells
///
/// Gives up after a bounded number of attempts and returns the last
/// candidate, which may overlap something.
pub fn random_empty_position<R: Rng + ?Sized>(rng: &mut R, trees: &[&QuadTree], size: u32) -> Vec2 {
    let half = size as f64 / 2.0;
    let span_x = ((world::WIDTH as u32).saturating_sub(size)).max(1);
    let span_y = ((world::HEIGHT as u32).saturating_sub(size)).max(1);

    let mut candidate = Vec2::new(world::WIDTH / 2.0, world::HEIGHT / 2.0);
    for _ in 0..generation::PLACEMENT_ATTEMPTS {
        candidate = Vec2::new(
            rng.gen_range(0..span_x) as f64 + half,
            rng.gen_range(0..span_y) as f64 + half,
        );
        if !is_occupied(trees, candidate, size) {
            break;
        }
    }
    candidate
}
