//! Contact damage and collectible pickups around a player

use crate::game::combat::{award, damage_player, damage_sentinel};
use crate::game::constants::{palette, pickup, rewards, sentinel};
use crate::game::engine::Sim;
use crate::game::entity::{DataNode, Entity, EntityId, EntityKind};
use crate::game::events::{EffectKind, VisualEffect};
use crate::util::vec2::Vec2;

#[inline]
fn within_reach(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < pickup::COLLECT_REACH && (a.y - b.y).abs() < pickup::COLLECT_REACH
}

/// Resolve sentinel contacts, data nodes and ore around a player's current position
pub fn resolve(sim: &mut Sim<'_>, id: &EntityId) {
    let world = sim.world;
    let Some((position, size)) = world
        .registry
        .players
        .read(id, |p| p.is_alive().then_some((p.header.position, p.header.size)))
        .flatten()
    else {
        return;
    };

    for entry in sim.nearby(position, pickup::QUERY_RADIUS) {
        // Contact damage may have killed the player earlier in this pass
        if !world.registry.players.read(id, |p| p.is_alive()).unwrap_or(false) {
            return;
        }

        match entry.kind {
            EntityKind::Sentinel => {
                let Some((other, other_size)) = world
                    .registry
                    .sentinels
                    .read(&entry.id, |s| (s.header.position, s.header.size))
                else {
                    continue;
                };
                let threshold = (size + other_size) as f64 / 2.0;
                if (other.x - position.x).abs() < threshold && (other.y - position.y).abs() < threshold {
                    damage_player(sim, id, sentinel::CONTACT_DAMAGE_TO_PLAYER, Some(&entry.id));
                    damage_sentinel(sim, &entry.id, sentinel::CONTACT_DAMAGE_TO_SENTINEL, Some(id));
                }
            }
            EntityKind::DataNode if within_reach(entry.position, position) => {
                collect_data_node(sim, id, &entry.id);
            }
            EntityKind::Ore if within_reach(entry.position, position) => {
                collect_ore(sim, id, &entry.id);
            }
            _ => {}
        }
    }
}

fn collect_data_node(sim: &mut Sim<'_>, player: &EntityId, node: &EntityId) {
    let world = sim.world;
    let Some(removed) = world.registry.remove_static(node) else {
        return;
    };

    award(sim, player, rewards::DATA_NODE_SCORE, rewards::DATA_NODE_EXP);
    sim.effect(VisualEffect::new(EffectKind::Collect, removed.position(), &removed.header().color));

    // Keep the node population constant
    let at = sim.random_empty_position(1);
    world
        .registry
        .insert_static(Entity::DataNode(DataNode::new(world.next_id(), at)));
}

fn collect_ore(sim: &mut Sim<'_>, player: &EntityId, ore: &EntityId) {
    let world = sim.world;
    let Some(removed) = world.registry.remove_static(ore) else {
        return;
    };
    let Entity::Ore(ore) = removed else {
        world.registry.insert_static(removed);
        return;
    };

    let value = ore.tier.value();
    world.registry.players.update(player, |p| *p.ores.get_mut(ore.tier) += 1);
    award(sim, player, value, value / 2);

    let healed = world.registry.players.update(player, |p| {
        let before = p.hp;
        p.hp = (p.hp + ore.tier.heal()).min(p.max_hp);
        (p.hp - before, p.header.name.clone(), p.header.color.clone())
    });
    if let Some((amount, name, color)) = healed {
        if amount > 0.0 {
            world.events.global(format!(
                "[{color}]{name} [{}]integrity restored (+{amount:.1} HP)",
                palette::SUCCESS
            ));
        }
    }

    sim.effect(VisualEffect::new(EffectKind::Collect, ore.header.position, &ore.header.color));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Ore, OreTier, SentinelKind};
    use crate::game::testing::TestWorld;

    #[test]
    fn test_data_node_collected_and_replaced() {
        let mut tw = TestWorld::new();
        let id = tw.spawn_player("neo", Vec2::new(100.5, 100.5));
        let node = tw.add_static(Entity::DataNode(DataNode::new(tw.world.next_id(), Vec2::new(101.2, 100.5))));
        tw.rebuild();

        tw.with_sim(|sim| resolve(sim, &id));

        assert!(tw.world.registry.get_static(&node).is_none());
        let nodes = tw.world.registry.statics().count(|e| matches!(e, Entity::DataNode(_)));
        assert_eq!(nodes, 1);
        let p = tw.player(&id);
        assert_eq!(p.score, rewards::DATA_NODE_SCORE);
        assert_eq!(p.experience, rewards::DATA_NODE_EXP);
        let effects = tw.world.events.drain_effects();
        assert!(effects.iter().any(|e| e.kind == EffectKind::Collect));
    }

    #[test]
    fn test_pickup_reach_is_strict() {
        let mut tw = TestWorld::new();
        let id = tw.spawn_player("neo", Vec2::new(100.5, 100.5));
        let node = tw.add_static(Entity::DataNode(DataNode::new(tw.world.next_id(), Vec2::new(101.3, 100.5))));
        tw.rebuild();

        tw.with_sim(|sim| resolve(sim, &id));
        assert!(tw.world.registry.get_static(&node).is_some());
        assert_eq!(tw.player(&id).score, 0);
    }

    #[test]
    fn test_ore_heals_and_scores() {
        let mut tw = TestWorld::new();
        let id = tw.spawn_player("neo", Vec2::new(100.5, 100.5));
        tw.world.registry.players.update(&id, |p| p.hp = 3.5);
        tw.add_static(Entity::Ore(Ore::new(tw.world.next_id(), Vec2::new(100.5, 100.9), OreTier::Silver)));
        tw.rebuild();
        tw.world.events.drain_global();

        tw.with_sim(|sim| resolve(sim, &id));

        let p = tw.player(&id);
        assert_eq!(p.ores.silver, 1);
        assert_eq!(p.score, OreTier::Silver.value());
        assert_eq!(p.experience, OreTier::Silver.value() / 2);
        assert_eq!(p.hp, p.max_hp);
        let lines = tw.world.events.drain_global();
        assert!(lines.iter().any(|l| l.contains("integrity restored (+1.5 HP)")));
    }

    #[test]
    fn test_ore_at_full_health_has_no_heal_line() {
        let mut tw = TestWorld::new();
        let id = tw.spawn_player("neo", Vec2::new(100.5, 100.5));
        tw.add_static(Entity::Ore(Ore::new(tw.world.next_id(), Vec2::new(100.5, 100.5), OreTier::Copper)));
        tw.rebuild();
        tw.world.events.drain_global();

        tw.with_sim(|sim| resolve(sim, &id));
        assert_eq!(tw.player(&id).ores.copper, 1);
        assert!(tw.world.events.drain_global().is_empty());
    }

    #[test]
    fn test_collected_ore_cannot_be_taken_twice() {
        let mut tw = TestWorld::new();
        let a = tw.spawn_player("a", Vec2::new(100.5, 100.5));
        let b = tw.spawn_player("b", Vec2::new(100.6, 100.5));
        tw.add_static(Entity::Ore(Ore::new(tw.world.next_id(), Vec2::new(100.5, 100.5), OreTier::Gold)));
        tw.rebuild();

        // Stale index entry still lists the ore for the second player
        tw.with_sim(|sim| {
            resolve(sim, &a);
            resolve(sim, &b);
        });
        assert_eq!(tw.player(&a).ores.gold + tw.player(&b).ores.gold, 1);
    }

    #[test]
    fn test_sentinel_contact_hurts_both() {
        let mut tw = TestWorld::new();
        let id = tw.spawn_player("neo", Vec2::new(100.5, 100.5));
        let s = tw.spawn_sentinel(SentinelKind::Regular, Vec2::new(101.0, 100.5));
        tw.rebuild();

        tw.with_sim(|sim| resolve(sim, &id));

        let p = tw.player(&id);
        assert!((p.hp - (p.max_hp - sentinel::CONTACT_DAMAGE_TO_PLAYER)).abs() < 1e-12);
        let hp = tw.world.registry.sentinels.read(&s, |s| s.hp).unwrap();
        assert!((hp - (3.0 - sentinel::CONTACT_DAMAGE_TO_SENTINEL)).abs() < 1e-12);
    }
}
