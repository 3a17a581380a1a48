//! Projectile firing and integration
//!
//! Projectiles move in a straight line. Each tick a projectile either
//! expires, strikes terrain or the map edge, hits a ship, or keeps flying.
//! Fast rounds are hit-tested at intermediate checkpoints so they cannot
//! tunnel through a target between ticks.

use rand::Rng;
use smallvec::SmallVec;

use crate::game::combat::{damage_meteorite, damage_player, damage_sentinel, explode};
use crate::game::constants::{projectile as consts, spatial};
use crate::game::engine::{Sim, World};
use crate::game::entity::{EntityId, EntityKind, Projectile};
use crate::game::events::{EffectKind, VisualEffect};
use crate::game::placement::is_valid_position;
use crate::game::spatial::SpatialEntry;
use crate::game::weapon::{FirePattern, Weapon};
use crate::util::vec2::Vec2;

/// Fire `weapon` from `origin` towards `target`; returns the new projectile ids
///
/// A target on top of the origin fires along +x.
pub fn fire_weapon<R: Rng + ?Sized>(
    world: &World,
    rng: &mut R,
    owner: EntityId,
    origin: Vec2,
    color: &str,
    weapon: &Weapon,
    target: Vec2,
) -> SmallVec<[EntityId; 5]> {
    let aim = target - origin;
    let base = if aim.length() < 1e-3 { 0.0 } else { aim.angle() };

    let mut offsets: SmallVec<[f64; 5]> = SmallVec::new();
    match weapon.pattern {
        FirePattern::Spread => {
            for i in -consts::SPREAD_HALF_COUNT..=consts::SPREAD_HALF_COUNT {
                offsets.push(i as f64 * consts::SPREAD_STEP);
            }
        }
        FirePattern::Single | FirePattern::Missile | FirePattern::Laser => offsets.push(0.0),
    }

    let mut fired = SmallVec::new();
    for offset in offsets {
        let angle = base + offset + (rng.gen::<f64>() - 0.5) * weapon.spread;
        let velocity = Vec2::from_angle(angle) * weapon.projectile_speed;
        let id = world.next_id();
        world
            .registry
            .projectiles
            .insert(id, Projectile::new(id, owner, origin, velocity, weapon, color));
        fired.push(id);
    }
    fired
}

/// Advance every projectile by one tick
pub fn integrate(sim: &mut Sim<'_>) {
    for id in sim.world.registry.projectiles.keys() {
        step(sim, &id);
    }
}

fn step(sim: &mut Sim<'_>, id: &EntityId) {
    let world = sim.world;
    let Some(p) = world.registry.projectiles.get(id) else {
        return;
    };

    let old = p.header.position;
    let next = old + p.velocity;
    let distance = p.distance + p.speed;
    let expired = distance >= p.max_range;

    if expired || !is_valid_position(next, 1) || sim.blocked(next, 1) {
        world.registry.projectiles.remove(id);
        if p.explosive {
            explode(sim, old, &p.owner, p.damage, &p.header.color);
        } else if !expired {
            sim.effect(VisualEffect::new(EffectKind::ProjectileDeath, old, &p.header.color));
        }
        // Running out of range is not a terrain hit
        if !expired {
            strike_terrain(sim, next, p.damage);
        }
        return;
    }

    let steps = if p.speed > consts::SUBSTEP_SPEED { 2 } else { 1 };
    for i in 1..=steps {
        let checkpoint = old + p.velocity * (i as f64 / steps as f64);
        let Some(target) = find_target(sim, checkpoint, &p) else {
            continue;
        };

        world.registry.projectiles.remove(id);
        match target.kind {
            EntityKind::Player => damage_player(sim, &target.id, p.damage, Some(&p.owner)),
            EntityKind::Sentinel => damage_sentinel(sim, &target.id, p.damage, Some(&p.owner)),
            _ => {}
        }
        if p.explosive {
            explode(sim, checkpoint, &p.owner, p.damage, &p.header.color);
        } else {
            sim.effect(VisualEffect::new(EffectKind::ProjectileDeath, checkpoint, &p.header.color));
        }
        return;
    }

    world.registry.projectiles.update(id, |q| {
        q.header.position = next;
        q.distance = distance;
    });
}

/// First ship, other than the shooter, whose live box contains `at`
fn find_target(sim: &Sim<'_>, at: Vec2, p: &Projectile) -> Option<SpatialEntry> {
    let registry = &sim.world.registry;
    let range = consts::HIT_QUERY_RADIUS + spatial::QUERY_MARGIN;
    sim.dynamic.find_first(at.x, at.y, range, range, |e| {
        if e.kind == EntityKind::Projectile || e.id == p.owner {
            return false;
        }
        let live = match e.kind {
            EntityKind::Player => registry
                .players
                .read(&e.id, |pl| pl.is_alive().then_some((pl.header.position, pl.header.size)))
                .flatten(),
            EntityKind::Sentinel => registry
                .sentinels
                .read(&e.id, |s| (s.header.position, s.header.size)),
            _ => None,
        };
        live.is_some_and(|(pos, size)| {
            let reach = size as f64 / 2.0 + consts::HIT_PADDING;
            (pos.x - at.x).abs() < reach && (pos.y - at.y).abs() < reach
        })
    })
}

/// Damage the meteorite a projectile ran into at `at`
fn strike_terrain(sim: &mut Sim<'_>, at: Vec2, damage: f64) {
    let statics = sim.world.registry.statics();
    let range = consts::TERRAIN_QUERY_RADIUS + spatial::QUERY_MARGIN;
    let hit = sim.statics.find_first(at.x, at.y, range, range, |e| {
        let reach = e.half_size() + consts::TERRAIN_PADDING;
        e.kind == EntityKind::Meteorite
            && (e.position.x - at.x).abs() < reach
            && (e.position.y - at.y).abs() < reach
            && statics.contains_key(&e.id)
    });
    if let Some(rock) = hit {
        damage_meteorite(sim, &rock.id, damage);
    }
}
