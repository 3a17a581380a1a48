//! Sentinel population control and AI
//!
//! Regular sentinels scale with the number of connected players and sleep
//! while nobody is near. Bosses spawn on their own timers and are always
//! awake.

use rand::Rng;
use tracing::info;

use crate::game::constants::{sentinel as consts, spatial};
use crate::game::engine::Sim;
use crate::game::entity::{EntityId, EntityKind, Sentinel, SentinelKind};
use crate::game::events::{EffectKind, VisualEffect};
use crate::game::placement::is_valid_position;
use crate::game::systems::projectile::fire_weapon;
use crate::util::vec2::Vec2;

/// Population targets and boss timers
#[derive(Debug, Clone)]
pub struct Population {
    per_player: usize,
    null_interval_ms: u64,
    fire_wall_interval_ms: u64,
    last_null_ms: u64,
    last_fire_wall_ms: u64,
}

impl Population {
    pub fn new(per_player: usize, null_interval_ms: u64, fire_wall_interval_ms: u64) -> Self {
        Self {
            per_player,
            null_interval_ms,
            fire_wall_interval_ms,
            last_null_ms: 0,
            last_fire_wall_ms: 0,
        }
    }

    /// Balance regular sentinels on population ticks, then check boss timers
    pub fn run(&mut self, sim: &mut Sim<'_>, tick: u64) {
        if tick % consts::POPULATION_EVERY_TICKS == 0 {
            self.balance(sim);
        }
        self.spawn_bosses(sim);
    }

    fn balance(&self, sim: &mut Sim<'_>) {
        let world = sim.world;
        let target = world.registry.players.len() * self.per_player;

        let mut regulars: Vec<EntityId> = Vec::new();
        world.registry.sentinels.for_each(|id, s| {
            if !s.kind.is_boss() {
                regulars.push(*id);
            }
        });

        if regulars.len() < target {
            for _ in regulars.len()..target {
                let at = sim.random_empty_position(1);
                let sentinel = Sentinel::new(world.next_id(), SentinelKind::Regular, at);
                world.registry.sentinels.insert(sentinel.header.id, sentinel);
            }
        } else {
            for id in regulars.iter().skip(target) {
                if let Some(culled) = world.registry.sentinels.remove(id) {
                    sim.effect(
                        VisualEffect::new(EffectKind::Explosion, culled.header.position, &culled.header.color)
                            .with_size(culled.header.size),
                    );
                }
            }
        }
    }

    fn spawn_bosses(&mut self, sim: &mut Sim<'_>) {
        if sim.world.registry.players.is_empty() {
            return;
        }
        let now = sim.now;

        if now.saturating_sub(self.last_null_ms) > self.null_interval_ms {
            self.last_null_ms = now;
            spawn_boss(sim, SentinelKind::Null);
        }
        if now.saturating_sub(self.last_fire_wall_ms) > self.fire_wall_interval_ms {
            self.last_fire_wall_ms = now;
            spawn_boss(sim, SentinelKind::FireWall);
        }
    }
}

/// Spawn a boss unless one of the same kind is alive
fn spawn_boss(sim: &mut Sim<'_>, kind: SentinelKind) {
    let world = sim.world;
    if world.registry.sentinels.count(|s| s.kind == kind) > 0 {
        return;
    }

    let probe = Sentinel::new(world.next_id(), kind, Vec2::ZERO);
    let at = sim.random_empty_position(probe.header.size);
    let mut boss = probe;
    boss.header.position = at;

    let announcement = match kind {
        SentinelKind::Null => format!("[{}]CRITICAL_ALERT: NULL detected in sector!", boss.header.color),
        SentinelKind::FireWall => format!(
            "[{}]SYSTEM_FAILURE: FIRE_WALL deployment detected. Brace for impact!",
            boss.header.color
        ),
        SentinelKind::Regular => return,
    };

    info!("Boss {} spawned at ({:.1}, {:.1})", boss.header.name, at.x, at.y);
    world.registry.sentinels.insert(boss.header.id, boss);
    world.events.global(announcement);
}

/// Wander, bounce and shoot for every awake sentinel
pub fn run_sentinels(sim: &mut Sim<'_>) {
    for id in sim.world.registry.sentinels.keys() {
        step(sim, &id);
    }
}

/// One tick of wander motion: the next position, or a reversal if it is blocked
pub fn move_or_bounce(sim: &Sim<'_>, position: Vec2, velocity: Vec2, size: u32) -> (Vec2, Vec2) {
    let next = position + velocity;
    if is_valid_position(next, size) && !sim.blocked(next, size) {
        (next, velocity)
    } else {
        (position, -velocity)
    }
}

fn step(sim: &mut Sim<'_>, id: &EntityId) {
    let world = sim.world;
    let Some((position, velocity, size, kind)) = world
        .registry
        .sentinels
        .read(id, |s| (s.header.position, s.velocity, s.header.size, s.kind))
    else {
        return;
    };

    if !kind.is_boss() {
        let range = consts::WAKE_RADIUS + spatial::QUERY_MARGIN;
        let awake = sim
            .dynamic
            .find_first(position.x, position.y, range, range, |e| e.kind == EntityKind::Player)
            .is_some();
        if !awake {
            return;
        }
    }

    let mut velocity = velocity;
    if sim.rng.gen_range(0..consts::JITTER_ONE_IN) == 0 {
        let speed = kind.jitter_speed();
        velocity = Vec2::new(
            (sim.rng.gen::<f64>() - 0.5) * speed,
            (sim.rng.gen::<f64>() - 0.5) * speed,
        );
    }
    let (position, velocity) = move_or_bounce(sim, position, velocity, size);

    let Some((weapon, color, last_shot_ms)) = world.registry.sentinels.update(id, |s| {
        s.header.position = position;
        s.velocity = velocity;
        (s.weapon, s.header.color.clone(), s.last_shot_ms)
    }) else {
        return;
    };

    let Some(target) = find_prey(sim, position, kind.detection_radius()) else {
        return;
    };
    if sim.now.saturating_sub(last_shot_ms) <= weapon.cooldown_ms {
        return;
    }
    world.registry.sentinels.update(id, |s| s.last_shot_ms = sim.now);
    fire_weapon(world, &mut *sim.rng, *id, position, &color, &weapon, target);
}

/// Live position of the first alive player strictly within `radius` of `at`
fn find_prey(sim: &Sim<'_>, at: Vec2, radius: f64) -> Option<Vec2> {
    let players = &sim.world.registry.players;
    let range = radius + spatial::QUERY_MARGIN;
    let in_range = |id: &EntityId| {
        players
            .read(id, |p| {
                (p.is_alive() && p.header.position.distance_sq_to(at) < radius * radius).then_some(p.header.position)
            })
            .flatten()
    };
    let entry = sim
        .dynamic
        .find_first(at.x, at.y, range, range, |e| e.kind == EntityKind::Player && in_range(&e.id).is_some())?;
    in_range(&entry.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Meteorite;
    use crate::game::testing::TestWorld;
    use uuid::Uuid;

    fn regulars(tw: &TestWorld) -> usize {
        tw.world.registry.sentinels.count(|s| !s.kind.is_boss())
    }

    #[test]
    fn test_population_scales_with_players() {
        let mut tw = TestWorld::new();
        tw.spawn_player("a", Vec2::new(10.5, 10.5));
        tw.spawn_player("b", Vec2::new(20.5, 20.5));
        let mut pop = Population::new(consts::PER_PLAYER, u64::MAX, u64::MAX);

        tw.with_sim(|sim| pop.run(sim, 0));
        assert_eq!(regulars(&tw), 2 * consts::PER_PLAYER);

        // Off-cycle ticks leave the population alone
        let b = tw.world.registry.find_player_by_name("b").unwrap();
        tw.world.registry.players.remove(&b);
        tw.with_sim(|sim| pop.run(sim, 1));
        assert_eq!(regulars(&tw), 2 * consts::PER_PLAYER);

        tw.with_sim(|sim| pop.run(sim, consts::POPULATION_EVERY_TICKS));
        assert_eq!(regulars(&tw), consts::PER_PLAYER);
        let culls = tw
            .world
            .events
            .drain_effects()
            .into_iter()
            .filter(|e| e.kind == EffectKind::Explosion)
            .count();
        assert_eq!(culls, consts::PER_PLAYER);
    }

    #[test]
    fn test_bosses_not_counted_or_culled() {
        let mut tw = TestWorld::new();
        let boss = tw.spawn_sentinel(SentinelKind::Null, Vec2::new(250.0, 250.0));
        let mut pop = Population::new(consts::PER_PLAYER, u64::MAX, u64::MAX);
        tw.with_sim(|sim| pop.run(sim, 0));
        assert!(tw.world.registry.sentinels.contains_key(&boss));
        assert_eq!(regulars(&tw), 0);
    }

    #[test]
    fn test_boss_timer_needs_players() {
        let mut tw = TestWorld::new();
        let mut pop = Population::new(0, 1_000, 2_000);
        tw.with_sim(|sim| pop.run(sim, 1));
        assert!(tw.world.registry.sentinels.is_empty());

        tw.spawn_player("a", Vec2::new(10.5, 10.5));
        tw.with_sim(|sim| pop.run(sim, 1));
        assert_eq!(tw.world.registry.sentinels.count(|s| s.kind == SentinelKind::Null), 1);
        assert_eq!(tw.world.registry.sentinels.count(|s| s.kind == SentinelKind::FireWall), 1);
        let lines = tw.world.events.drain_global();
        assert!(lines.iter().any(|l| l.contains("CRITICAL_ALERT")));
        assert!(lines.iter().any(|l| l.contains("SYSTEM_FAILURE")));
    }

    #[test]
    fn test_bosses_spawn_on_first_tick_with_wall_clock_time() {
        let mut tw = TestWorld::new();
        tw.clock.set(1_700_000_000_000);
        tw.spawn_player("a", Vec2::new(10.5, 10.5));
        let mut pop = Population::new(0, consts::NULL_INTERVAL_MS, consts::FIRE_WALL_INTERVAL_MS);
        tw.with_sim(|sim| pop.run(sim, 1));
        assert_eq!(tw.world.registry.sentinels.count(|s| s.kind == SentinelKind::Null), 1);
        assert_eq!(tw.world.registry.sentinels.count(|s| s.kind == SentinelKind::FireWall), 1);
    }

    #[test]
    fn test_boss_not_duplicated_while_alive() {
        let mut tw = TestWorld::new();
        tw.spawn_player("a", Vec2::new(10.5, 10.5));
        let mut pop = Population::new(0, 1_000, u64::MAX);
        tw.with_sim(|sim| pop.run(sim, 1));

        tw.clock.advance(1_001);
        tw.with_sim(|sim| pop.run(sim, 2));
        assert_eq!(tw.world.registry.sentinels.count(|s| s.kind == SentinelKind::Null), 1);
    }

    #[test]
    fn test_bounce_off_edge_and_rock() {
        let mut tw = TestWorld::new();
        tw.add_meteorite(Meteorite::new(Uuid::new_v4(), Vec2::new(50.5, 50.5), None));
        tw.rebuild();

        tw.with_sim(|sim| {
            let (pos, vel) = move_or_bounce(sim, Vec2::new(0.51, 20.0), Vec2::new(-0.02, 0.01), 1);
            assert_eq!(pos, Vec2::new(0.51, 20.0));
            assert_eq!(vel, Vec2::new(0.02, -0.01));

            let (pos, vel) = move_or_bounce(sim, Vec2::new(49.49, 50.5), Vec2::new(0.02, 0.0), 1);
            assert_eq!(pos, Vec2::new(49.49, 50.5));
            assert_eq!(vel, Vec2::new(-0.02, 0.0));

            let (pos, _) = move_or_bounce(sim, Vec2::new(30.0, 30.0), Vec2::new(0.02, 0.0), 1);
            assert!((pos.x - 30.02).abs() < 1e-12);
        });
    }

    #[test]
    fn test_regular_sleeps_without_players() {
        let mut tw = TestWorld::new();
        let s = tw.spawn_sentinel(SentinelKind::Regular, Vec2::new(250.0, 250.0));
        tw.world.registry.sentinels.update(&s, |s| s.velocity = Vec2::new(0.02, 0.0));
        tw.spawn_player("far", Vec2::new(10.5, 10.5));
        tw.rebuild();

        for _ in 0..100 {
            tw.with_sim(|sim| run_sentinels(sim));
        }
        let pos = tw.world.registry.sentinels.read(&s, |s| s.header.position).unwrap();
        assert_eq!(pos, Vec2::new(250.0, 250.0));
    }

    #[test]
    fn test_sentinel_fires_at_player_in_range() {
        let mut tw = TestWorld::new();
        let s = tw.spawn_sentinel(SentinelKind::Regular, Vec2::new(100.0, 100.0));
        tw.spawn_player("prey", Vec2::new(105.0, 100.0));
        tw.rebuild();

        tw.with_sim(|sim| run_sentinels(sim));
        let shots = tw.world.registry.projectiles.values();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].owner, s);

        // Cooldown holds until the clock moves
        tw.with_sim(|sim| run_sentinels(sim));
        assert_eq!(tw.world.registry.projectiles.len(), 1);
        tw.clock.advance(crate::game::weapon::Weapon::BASIC.cooldown_ms + 1);
        tw.with_sim(|sim| run_sentinels(sim));
        assert_eq!(tw.world.registry.projectiles.len(), 2);
    }

    #[test]
    fn test_sentinel_ignores_player_outside_detection() {
        let mut tw = TestWorld::new();
        tw.spawn_sentinel(SentinelKind::Regular, Vec2::new(100.0, 100.0));
        tw.spawn_player("prey", Vec2::new(100.0, 100.0 + consts::REGULAR_DETECTION + 0.5));
        tw.rebuild();

        tw.with_sim(|sim| run_sentinels(sim));
        assert!(tw.world.registry.projectiles.is_empty());
    }
}
