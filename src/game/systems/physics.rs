//! Player movement, respawn and shield regeneration
//!
//! CRITICAL: friction is 1.0, so a ship drifts at constant velocity until it
//! hits something. Only the zero-snap below ZERO_SNAP brings it to rest.

use rand::Rng;

use crate::game::combat::impact_damage;
use crate::game::constants::{impact, movement, player as player_consts, world};
use crate::game::engine::Sim;
use crate::game::entity::{DirectionSet, EntityId};
use crate::game::placement::clamp_axis;
use crate::game::systems::pickup;
use crate::util::vec2::Vec2;

/// Acceleration and speed cap for a player, halved while scanning
fn limits(scanner: bool) -> (f64, f64) {
    if scanner {
        (
            movement::ACCEL * movement::SCANNER_FACTOR,
            movement::MAX_SPEED * movement::SCANNER_FACTOR,
        )
    } else {
        (movement::ACCEL, movement::MAX_SPEED)
    }
}

/// Bring back every player whose respawn timer has elapsed
pub fn respawn_players(sim: &mut Sim<'_>) {
    let now = sim.now;
    let mut due: Vec<EntityId> = Vec::new();
    sim.world.registry.players.for_each(|id, p| {
        if p.respawn_at_ms > 0 && now >= p.respawn_at_ms {
            due.push(*id);
        }
    });

    for id in due {
        let position = sim.random_empty_position(1);
        sim.world.registry.players.update(&id, |p| {
            if p.respawn_at_ms == 0 || now < p.respawn_at_ms {
                return;
            }
            p.respawn_at_ms = 0;
            p.header.position = position;
            p.hp = p.max_hp;
            p.shield = p.max_shield as f64;
            p.velocity = Vec2::ZERO;
            p.held = DirectionSet::empty();
        });
    }
}

/// Accelerate every living player along their held directions
pub fn apply_held_directions(sim: &Sim<'_>) {
    sim.world.registry.players.for_each_mut(|_, p| {
        if !p.is_alive() {
            return;
        }
        let (accel, max_speed) = limits(p.scanner);
        for direction in p.held.directions() {
            p.velocity += direction.unit() * accel;
            p.velocity = p.velocity.clamp_length(max_speed);
        }
    });
}

/// Occasionally restore one shield point to every living player
pub fn regenerate_shields(sim: &mut Sim<'_>) {
    if sim.rng.gen_range(0..player_consts::SHIELD_REGEN_ONE_IN) != 0 {
        return;
    }
    sim.world.registry.players.for_each_mut(|_, p| {
        if p.is_alive() {
            p.shield = (p.shield + 1.0).min(p.max_shield as f64);
        }
    });
}

/// Move every living player, resolving terrain and edge collisions, then pickups
pub fn integrate_players(sim: &mut Sim<'_>) {
    for id in sim.world.registry.players.keys() {
        step_player(sim, &id);
    }
}

/// Damage dealt by a collision at `speed`, if any
pub fn impact_band(speed: f64) -> Option<f64> {
    if speed <= impact::MIN_SPEED {
        None
    } else if speed > impact::HEAVY_SPEED {
        Some(impact::HEAVY_DAMAGE)
    } else if speed > impact::MEDIUM_SPEED {
        Some(impact::MEDIUM_DAMAGE)
    } else {
        Some(impact::LIGHT_DAMAGE)
    }
}

fn step_player(sim: &mut Sim<'_>, id: &EntityId) {
    let Some((position, mut velocity, size, scanner)) = sim
        .world
        .registry
        .players
        .read(id, |p| p.is_alive().then_some((p.header.position, p.velocity, p.header.size, p.scanner)))
        .flatten()
    else {
        return;
    };

    let half = size as f64 / 2.0;
    let speed = velocity.length();
    let mut next = position + velocity;
    let mut collided = false;

    // Map edges
    if next.x < half || next.x >= world::WIDTH - half {
        next.x = clamp_axis(next.x, half, world::WIDTH);
        velocity.x = 0.0;
        collided = true;
    }
    if next.y < half || next.y >= world::HEIGHT - half {
        next.y = clamp_axis(next.y, half, world::HEIGHT);
        velocity.y = 0.0;
        collided = true;
    }

    // Terrain, one axis at a time so ships slide along walls
    if sim.blocked(Vec2::new(next.x, position.y), size) {
        next.x = position.x;
        velocity.x = 0.0;
        collided = true;
    }
    if sim.blocked(Vec2::new(next.x, next.y), size) {
        next.y = position.y;
        velocity.y = 0.0;
        collided = true;
    }

    velocity *= movement::FRICTION;
    if scanner {
        velocity = velocity.clamp_length(movement::MAX_SPEED * movement::SCANNER_FACTOR);
    }
    if velocity.x.abs() < movement::ZERO_SNAP {
        velocity.x = 0.0;
    }
    if velocity.y.abs() < movement::ZERO_SNAP {
        velocity.y = 0.0;
    }

    sim.world.registry.players.update(id, |p| {
        if p.is_alive() {
            p.header.position = next;
            p.velocity = velocity;
        }
    });

    if collided {
        if let Some(damage) = impact_band(speed) {
            impact_damage(sim, id, damage);
        }
    }

    pickup::resolve(sim, id);
}
