//! Combat and progression resolver
//!
//! Damage always drains shield before hit points. Deaths, loot drops,
//! kill credit and level-ups are resolved here and reported through the
//! event and effect queues.

use rand::Rng;
use smallvec::SmallVec;

use crate::game::constants::{palette, player as player_consts, projectile, rewards, world as world_consts};
use crate::game::engine::Sim;
use crate::game::entity::{Entity, EntityId, EntityKind, Ore, OreCounts, OreTier, Player, SentinelKind};
use crate::game::events::{EffectKind, VisualEffect};
use crate::game::placement::clamp_axis;
use crate::game::weapon::{unlock_for_level, Weapon};
use crate::util::vec2::Vec2;

// ============================================================================
// Pure rules
// ============================================================================

/// Apply `damage` to shield first, then the remainder to hit points
pub fn absorb(shield: &mut f64, hp: &mut f64, damage: f64) {
    let mut remaining = damage.max(0.0);
    if *shield > 0.0 {
        let taken = shield.min(remaining);
        *shield -= taken;
        remaining -= taken;
    }
    if remaining > 0.0 {
        *hp -= remaining;
    }
}

/// Whether the closest point of a `size` box at `pos` is strictly inside the blast
pub fn in_blast(center: Vec2, pos: Vec2, size: u32, radius: f64) -> bool {
    let half = size as f64 / 2.0;
    let closest = Vec2::new(
        center.x.clamp(pos.x - half, pos.x + half),
        center.y.clamp(pos.y - half, pos.y + half),
    );
    center.distance_sq_to(closest) < radius * radius
}

/// One level gained through experience
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelUp {
    pub level: u32,
    pub shield_upgraded: bool,
    pub unlocked: Option<Weapon>,
}

impl Player {
    /// Experience required to leave the current level
    pub fn level_threshold(&self) -> u64 {
        self.level.max(1) as u64 * player_consts::EXP_PER_LEVEL
    }

    /// Add experience, levelling up as many times as it covers
    pub fn gain_experience(&mut self, amount: u64) -> SmallVec<[LevelUp; 2]> {
        let mut gained = SmallVec::new();
        self.experience += amount;

        while self.experience >= self.level_threshold() {
            self.experience -= self.level_threshold();
            self.level += 1;
            self.hp = self.max_hp;
            self.shield = 0.0;

            let shield_upgraded = self.max_shield < player_consts::MAX_SHIELD_CAP;
            if shield_upgraded {
                self.max_shield += 1;
            }

            let unlocked = unlock_for_level(self.level);
            if let Some(weapon) = unlocked {
                self.weapon = weapon;
            }

            gained.push(LevelUp {
                level: self.level,
                shield_upgraded,
                unlocked,
            });
        }
        gained
    }

    /// Reset to a fresh level-1 agent and arm the respawn timer; returns the ore carried
    pub fn die(&mut self, now_ms: u64) -> OreCounts {
        let dropped = std::mem::take(&mut self.ores);
        self.hp = 0.0;
        self.shield = 0.0;
        self.max_shield = 0;
        self.level = 1;
        self.experience = 0;
        self.weapon = Weapon::BASIC;
        self.velocity = Vec2::ZERO;
        self.respawn_at_ms = (now_ms + player_consts::RESPAWN_DELAY_MS).max(1);
        self.score = self.score.saturating_sub(player_consts::DEATH_PENALTY);
        self.held = Default::default();
        dropped
    }
}

// ============================================================================
// Progression announcements
// ============================================================================

fn announce_level_ups(sim: &Sim<'_>, name: &str, color: &str, ups: &[LevelUp]) {
    let events = &sim.world.events;
    let info = palette::INFO;
    for up in ups {
        if up.shield_upgraded {
            events.global(format!("[{color}]Agent {name} [{info}]shield capacity upgraded!"));
        }
        if let Some(weapon) = up.unlocked {
            events.global(format!("[{color}]Agent {name} [{info}]unlocked {}!", weapon.name));
        }
        events.global(format!("[{color}]Agent {name} [{info}]leveled up to Lvl {}!", up.level));
    }
}

/// Add score and experience to a player; returns their name and color if present
pub fn award(sim: &Sim<'_>, player: &EntityId, score: u64, experience: u64) -> Option<(String, String)> {
    let (name, color, ups) = sim.world.registry.players.update(player, |p| {
        p.score += score;
        let ups = p.gain_experience(experience);
        (p.header.name.clone(), p.header.color.clone(), ups)
    })?;
    announce_level_ups(sim, &name, &color, &ups);
    Some((name, color))
}

// ============================================================================
// Players
// ============================================================================

struct PlayerHit {
    position: Vec2,
    size: u32,
    name: String,
    color: String,
    dropped: Option<OreCounts>,
}

fn hit_player(sim: &mut Sim<'_>, target: &EntityId, damage: f64) -> Option<PlayerHit> {
    let now = sim.now;
    let hit = sim
        .world
        .registry
        .players
        .update(target, |p| {
            if !p.is_alive() {
                return None;
            }
            absorb(&mut p.shield, &mut p.hp, damage);
            let dropped = (p.hp <= 0.0).then(|| p.die(now));
            Some(PlayerHit {
                position: p.header.position,
                size: p.header.size,
                name: p.header.name.clone(),
                color: p.header.color.clone(),
                dropped,
            })
        })
        .flatten()?;

    let world = sim.world;
    world.events.effect(VisualEffect::new(EffectKind::Hit, hit.position, &hit.color));
    if let Some(dropped) = hit.dropped {
        world.events.effect(VisualEffect::new(EffectKind::Explosion, hit.position, &hit.color).with_size(hit.size));
        for tier in OreTier::ALL {
            spawn_ore_batch(sim, hit.position, tier, dropped.get(tier));
        }
    }
    Some(hit)
}

/// Damage a player; a kill credits `attacker` when it is a player
pub fn damage_player(sim: &mut Sim<'_>, target: &EntityId, damage: f64, attacker: Option<&EntityId>) {
    let Some(hit) = hit_player(sim, target, damage) else {
        return;
    };
    if hit.dropped.is_none() {
        return;
    }

    let credited = attacker.and_then(|a| award(sim, a, rewards::PLAYER_KILL_SCORE, rewards::PLAYER_KILL_EXP));
    let err = palette::ERROR;
    match credited {
        Some((killer, killer_color)) => sim.world.events.global(format!(
            "[{killer_color}]Agent {killer} [{err}]terminated [{}]Agent {}",
            hit.color, hit.name
        )),
        None => sim
            .world
            .events
            .global(format!("[{err}]Agent {} was decommissioned.", hit.name)),
    }
}

/// Collision damage from hitting terrain or the map edge
pub fn impact_damage(sim: &mut Sim<'_>, target: &EntityId, damage: f64) {
    if let Some(hit) = hit_player(sim, target, damage) {
        if hit.dropped.is_some() {
            sim.world.events.global(format!(
                "[{}]Agent {} structural failure due to impact.",
                palette::ERROR,
                hit.name
            ));
        }
    }
}

// ============================================================================
// Sentinels
// ============================================================================

/// Damage a sentinel; a kill removes it, drops boss loot and credits `attacker`
pub fn damage_sentinel(sim: &mut Sim<'_>, target: &EntityId, damage: f64, attacker: Option<&EntityId>) {
    let Some((position, color, size, kind, dead)) = sim.world.registry.sentinels.update(target, |s| {
        absorb(&mut s.shield, &mut s.hp, damage);
        (s.header.position, s.header.color.clone(), s.header.size, s.kind, s.hp <= 0.0)
    }) else {
        return;
    };

    sim.world.events.effect(VisualEffect::new(EffectKind::Hit, position, &color));
    if !dead || sim.world.registry.sentinels.remove(target).is_none() {
        return;
    }
    sim.world
        .events
        .effect(VisualEffect::new(EffectKind::Explosion, position, &color).with_size(size));

    match kind {
        SentinelKind::FireWall => {
            sim.world
                .events
                .global(format!("[{}]FIRE_WALL breached! System access granted.", palette::ERROR));
            spawn_ore_batch(sim, position, OreTier::Gold, rewards::FIRE_WALL_GOLD);
        }
        SentinelKind::Null => {
            sim.world.events.global(format!("[{}]NULL neutralized!", palette::BOSS));
            spawn_ore_batch(sim, position, OreTier::Gold, rewards::NULL_GOLD);
            spawn_ore_batch(sim, position, OreTier::Silver, rewards::NULL_SILVER);
        }
        SentinelKind::Regular => {
            sim.world
                .events
                .global(format!("[{}]Sentinel decommissioned.", palette::ERROR));
        }
    }

    if let Some(attacker) = attacker {
        let (score, exp) = if kind.is_boss() {
            (rewards::BOSS_KILL_SCORE, rewards::BOSS_KILL_EXP)
        } else {
            (rewards::SENTINEL_KILL_SCORE, rewards::SENTINEL_KILL_EXP)
        };
        award(sim, attacker, score, exp);
    }
}

// ============================================================================
// Terrain and loot
// ============================================================================

/// Scatter `count` ore pickups of `tier` around `at`; drops past the map edge are clamped back inside
pub fn spawn_ore_batch(sim: &mut Sim<'_>, at: Vec2, tier: OreTier, count: u32) {
    let scatter = player_consts::DROP_SCATTER;
    for _ in 0..count {
        let offset = Vec2::new(
            (sim.rng.gen::<f64>() - 0.5) * scatter,
            (sim.rng.gen::<f64>() - 0.5) * scatter,
        );
        let scattered = at + offset;
        let pos = Vec2::new(
            clamp_axis(scattered.x, 0.5, world_consts::WIDTH),
            clamp_axis(scattered.y, 0.5, world_consts::HEIGHT),
        );
        let id = sim.world.next_id();
        sim.world.registry.insert_static(Entity::Ore(Ore::new(id, pos, tier)));
    }
}

/// Chip a meteorite; destroys it at zero health
pub fn damage_meteorite(sim: &mut Sim<'_>, id: &EntityId, damage: f64) {
    let state = sim
        .world
        .registry
        .update_static(id, |e| match e {
            Entity::Meteorite(m) => {
                m.health -= damage;
                Some((m.health, m.header.position, m.header.color.clone()))
            }
            _ => None,
        })
        .flatten();

    match state {
        Some((health, _, _)) if health <= 0.0 => destroy_meteorite(sim, id),
        Some((_, position, color)) => sim
            .world
            .events
            .effect(VisualEffect::new(EffectKind::Hit, position, &color)),
        None => {}
    }
}

/// Remove a meteorite, leaving an ore pickup if it carried resources
pub fn destroy_meteorite(sim: &mut Sim<'_>, id: &EntityId) {
    let Some(removed) = sim.world.registry.remove_static(id) else {
        return;
    };
    let Entity::Meteorite(meteorite) = removed else {
        // Not ours to remove; put it back
        sim.world.registry.insert_static(removed);
        return;
    };

    let header = &meteorite.header;
    sim.world.events.effect(
        VisualEffect::new(EffectKind::Debris, header.position, &header.color).with_size(header.size),
    );
    if let Some(tier) = meteorite.resource {
        let ore_id = sim.world.next_id();
        sim.world
            .registry
            .insert_static(Entity::Ore(Ore::new(ore_id, header.position, tier)));
    }
}

// ============================================================================
// Explosions
// ============================================================================

/// Area damage around `at`; the projectile's owner is never hit by its own blast
pub fn explode(sim: &mut Sim<'_>, at: Vec2, owner: &EntityId, damage: f64, color: &str) {
    sim.world.events.effect(
        VisualEffect::new(EffectKind::Explosion, at, color).with_size(projectile::BLAST_EFFECT_SIZE),
    );

    let world = sim.world;
    let registry = &world.registry;
    let radius = projectile::BLAST_RADIUS;
    for entry in sim.nearby(at, radius) {
        if entry.id == *owner {
            continue;
        }
        match entry.kind {
            EntityKind::Player => {
                let live = registry
                    .players
                    .read(&entry.id, |p| p.is_alive().then_some((p.header.position, p.header.size)))
                    .flatten();
                if let Some((pos, size)) = live {
                    if in_blast(at, pos, size, radius) {
                        damage_player(sim, &entry.id, damage, Some(owner));
                    }
                }
            }
            EntityKind::Sentinel => {
                let live = registry
                    .sentinels
                    .read(&entry.id, |s| (s.header.position, s.header.size));
                if let Some((pos, size)) = live {
                    if in_blast(at, pos, size, radius) {
                        damage_sentinel(sim, &entry.id, damage, Some(owner));
                    }
                }
            }
            EntityKind::Meteorite => {
                if in_blast(at, entry.position, entry.size, radius) {
                    damage_meteorite(sim, &entry.id, damage);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Meteorite, Sentinel};
    use crate::game::placement::is_valid_position;
    use crate::game::testing::TestWorld;
    use crate::util::clock::Clock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn player() -> Player {
        Player::new(Uuid::new_v4(), "neo", "[P]", "#58a6ff", Vec2::new(100.5, 100.5))
    }

    #[test]
    fn test_shield_absorbs_before_hp() {
        let (mut shield, mut hp) = (3.0, 5.0);
        absorb(&mut shield, &mut hp, 5.0);
        assert_eq!(shield, 0.0);
        assert_eq!(hp, 3.0);
    }

    #[test]
    fn test_shield_partial_absorb() {
        let (mut shield, mut hp) = (3.0, 5.0);
        absorb(&mut shield, &mut hp, 1.0);
        assert_eq!(shield, 2.0);
        assert_eq!(hp, 5.0);
    }

    #[test]
    fn test_level_up_once() {
        let mut p = player();
        p.experience = 450;
        p.hp = 2.0;
        p.shield = 0.5;
        let ups = p.gain_experience(100);
        assert_eq!(ups.len(), 1);
        assert_eq!(p.level, 2);
        assert_eq!(p.experience, 50);
        assert_eq!(p.hp, p.max_hp);
        assert_eq!(p.shield, 0.0);
        assert_eq!(p.max_shield, 1);
        assert_eq!(p.weapon, Weapon::SHOTGUN);
    }

    #[test]
    fn test_level_up_multiple_and_shield_cap() {
        let mut p = player();
        // 500 + 1000 + 1500 + 2000 = 5000 takes level 1 to 5
        let ups = p.gain_experience(5_000 + 10);
        assert_eq!(p.level, 5);
        assert_eq!(p.experience, 10);
        assert_eq!(ups.len(), 4);
        assert_eq!(p.max_shield, player_consts::MAX_SHIELD_CAP);
        assert!(!ups[3].shield_upgraded);
        assert_eq!(p.weapon, Weapon::LASER);
    }

    #[test]
    fn test_death_resets_progress() {
        let mut p = player();
        p.level = 4;
        p.experience = 77;
        p.score = 150;
        p.weapon = Weapon::LASER;
        p.max_shield = 2;
        p.ores = OreCounts { copper: 2, silver: 1, gold: 3 };
        let dropped = p.die(10_000);
        assert_eq!(dropped.total(), 6);
        assert_eq!(p.ores.total(), 0);
        assert_eq!(p.level, 1);
        assert_eq!(p.experience, 0);
        assert_eq!(p.score, 0);
        assert_eq!(p.weapon, Weapon::BASIC);
        assert_eq!(p.max_shield, 0);
        assert_eq!(p.respawn_at_ms, 13_000);
        assert!(!p.is_alive());
    }

    #[test]
    fn test_blast_edge_is_strict() {
        let center = Vec2::new(10.0, 10.0);
        let r = projectile::BLAST_RADIUS;
        // Box of size 1: closest point is centre.x - 0.5
        let edge = Vec2::new(10.0 + r + 0.5, 10.0);
        assert!(!in_blast(center, edge, 1, r));
        let inside = Vec2::new(10.0 + r + 0.5 - 1e-9, 10.0);
        assert!(in_blast(center, inside, 1, r));
    }

    #[test]
    fn test_blast_reaches_large_box_by_edge() {
        let center = Vec2::new(10.0, 10.0);
        // Centre 6 away, but an 8-wide box reaches within 2
        assert!(in_blast(center, Vec2::new(16.0, 10.0), 8, 2.5));
        assert!(!in_blast(center, Vec2::new(16.0, 10.0), 1, 2.5));
    }

    #[test]
    fn test_explosion_damage_at_boundary() {
        let mut tw = TestWorld::new();
        let owner = Uuid::new_v4();
        let r = projectile::BLAST_RADIUS;

        let outside = tw.add_meteorite(Meteorite::large(Uuid::new_v4(), Vec2::new(100.0 + r + 0.5, 100.0), 1, 5.0));
        let inside = tw.add_meteorite(Meteorite::large(Uuid::new_v4(), Vec2::new(100.0, 100.0 - r - 0.5 + 1e-6), 1, 5.0));
        tw.rebuild();

        tw.with_sim(|sim| explode(sim, Vec2::new(100.0, 100.0), &owner, 3.0, "#fff"));

        let health = |id: &EntityId| match tw.world.registry.get_static(id) {
            Some(Entity::Meteorite(m)) => m.health,
            _ => f64::NAN,
        };
        assert_eq!(health(&outside), 5.0);
        assert_eq!(health(&inside), 2.0);
    }

    #[test]
    fn test_explosion_skips_owner() {
        let mut tw = TestWorld::new();
        let owner = tw.spawn_player("owner", Vec2::new(50.5, 50.5));
        let victim = tw.spawn_player("victim", Vec2::new(51.5, 50.5));
        tw.rebuild();

        tw.with_sim(|sim| explode(sim, Vec2::new(51.0, 50.5), &owner, 1.0, "#fff"));

        assert_eq!(tw.player(&owner).hp, 5.0);
        assert_eq!(tw.player(&victim).hp, 4.0);
    }

    #[test]
    fn test_player_kill_credits_shooter() {
        let mut tw = TestWorld::new();
        let killer = tw.spawn_player("killer", Vec2::new(20.5, 20.5));
        let victim = tw.spawn_player("victim", Vec2::new(30.5, 30.5));
        tw.world.registry.players.update(&victim, |p| {
            p.score = 1_000;
            p.ores.gold = 2;
        });
        tw.world.events.drain_global();

        tw.with_sim(|sim| damage_player(sim, &victim, 10.0, Some(&killer)));

        let k = tw.player(&killer);
        assert_eq!(k.score, rewards::PLAYER_KILL_SCORE);
        assert_eq!(k.experience, rewards::PLAYER_KILL_EXP);

        let v = tw.player(&victim);
        assert_eq!(v.score, 800);
        assert_eq!(v.respawn_at_ms, tw.clock.now_ms() + player_consts::RESPAWN_DELAY_MS);

        let lines = tw.world.events.drain_global();
        assert!(lines.iter().any(|l| l.contains("terminated")));
        let effects = tw.world.events.drain_effects();
        assert!(effects.iter().any(|e| e.kind == EffectKind::Explosion));
    }

    #[test]
    fn test_unattributed_death_is_decommissioned() {
        let mut tw = TestWorld::new();
        let victim = tw.spawn_player("victim", Vec2::new(30.5, 30.5));
        tw.world.events.drain_global();
        tw.with_sim(|sim| damage_player(sim, &victim, 6.0, Some(&Uuid::new_v4())));
        let lines = tw.world.events.drain_global();
        assert!(lines.iter().any(|l| l.contains("was decommissioned")));
    }

    #[test]
    fn test_dead_player_takes_no_damage() {
        let mut tw = TestWorld::new();
        let victim = tw.spawn_player("victim", Vec2::new(30.5, 30.5));
        tw.with_sim(|sim| damage_player(sim, &victim, 6.0, None));
        tw.world.events.drain_effects();
        tw.with_sim(|sim| damage_player(sim, &victim, 6.0, None));
        assert!(tw.world.events.drain_effects().is_empty());
    }

    #[test]
    fn test_corner_death_drops_every_ore_inside_map() {
        for seed in 0..50 {
            let mut tw = TestWorld::new();
            tw.rng = StdRng::seed_from_u64(seed);
            let victim = tw.spawn_player("victim", Vec2::new(0.6, 0.6));
            tw.world.registry.players.update(&victim, |p| {
                p.ores.copper = 2;
                p.ores.gold = 1;
            });

            tw.with_sim(|sim| damage_player(sim, &victim, 6.0, None));

            let mut drops = Vec::new();
            tw.world.registry.statics().for_each(|_, e| {
                if let Entity::Ore(o) = e {
                    drops.push((o.tier, o.header.position));
                }
            });
            assert_eq!(drops.len(), 3, "seed {seed}");
            assert_eq!(drops.iter().filter(|(t, _)| *t == OreTier::Copper).count(), 2);
            assert!(drops.iter().all(|(_, pos)| is_valid_position(*pos, 1)), "seed {seed}");
            assert_eq!(tw.player(&victim).ores.total(), 0);
        }
    }

    #[test]
    fn test_boss_loot_at_far_edge_stays_on_map() {
        let mut tw = TestWorld::new();
        let boss = Sentinel::new(tw.world.next_id(), SentinelKind::FireWall, Vec2::new(world_consts::WIDTH - 0.6, 250.0));
        let boss_id = boss.header.id;
        tw.world.registry.sentinels.insert(boss_id, boss);

        tw.with_sim(|sim| damage_sentinel(sim, &boss_id, 5_000.0, None));

        let mut drops = Vec::new();
        tw.world.registry.statics().for_each(|_, e| {
            if let Entity::Ore(o) = e {
                drops.push(o.header.position);
            }
        });
        assert_eq!(drops.len(), rewards::FIRE_WALL_GOLD as usize);
        assert!(drops.iter().all(|pos| is_valid_position(*pos, 1)));
    }

    #[test]
    fn test_null_boss_drops_loot_and_credits() {
        let mut tw = TestWorld::new();
        let hunter = tw.spawn_player("hunter", Vec2::new(20.5, 20.5));
        let boss = Sentinel::new(tw.world.next_id(), SentinelKind::Null, Vec2::new(200.0, 200.0));
        let boss_id = boss.header.id;
        tw.world.registry.sentinels.insert(boss_id, boss);

        tw.with_sim(|sim| damage_sentinel(sim, &boss_id, 100.0, Some(&hunter)));

        assert!(!tw.world.registry.sentinels.contains_key(&boss_id));
        let ores = tw.world.registry.statics().count(|e| matches!(e, Entity::Ore(_)));
        assert_eq!(ores, (rewards::NULL_GOLD + rewards::NULL_SILVER) as usize);
        let h = tw.player(&hunter);
        assert_eq!(h.score, rewards::BOSS_KILL_SCORE);
        // 1000 exp: level 1 -> 2 costs 500, leaving 500 of the 1000 needed for 3
        assert_eq!(h.level, 2);
        assert_eq!(h.experience, 500);
    }

    #[test]
    fn test_resource_meteorite_leaves_ore() {
        let mut tw = TestWorld::new();
        let rock = tw.add_meteorite(Meteorite::new(Uuid::new_v4(), Vec2::new(40.5, 40.5), Some(OreTier::Silver)));
        tw.with_sim(|sim| damage_meteorite(sim, &rock, 1.0));
        assert!(tw.world.registry.get_static(&rock).is_some());
        tw.with_sim(|sim| damage_meteorite(sim, &rock, 2.0));
        assert!(tw.world.registry.get_static(&rock).is_none());

        let ore = tw
            .world
            .registry
            .statics()
            .find_map(|_, e| match e {
                Entity::Ore(o) => Some((o.tier, o.header.position)),
                _ => None,
            });
        assert_eq!(ore, Some((OreTier::Silver, Vec2::new(40.5, 40.5))));
        let effects = tw.world.events.drain_effects();
        assert!(effects.iter().any(|e| e.kind == EffectKind::Debris));
    }
}
