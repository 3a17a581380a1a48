//! Area of interest: which objects one player receives
//!
//! A snapshot lists, in order and without duplicates:
//! 1. everything near the player in both indices,
//! 2. every alive player and every sentinel (radar),
//! 3. data nodes within the wider node radius,
//! 4. the player themselves.
//!
//! Index entries only name candidates; every view is read from the live
//! registry so objects removed during the tick are skipped.

use rustc_hash::FxHashSet;

use crate::game::constants::{spatial, view};
use crate::game::engine::TickEngine;
use crate::game::entity::{EntityId, EntityKind};
use crate::game::events::VisualEffect;
use crate::game::registry::Registry;
use crate::game::spatial::SpatialEntry;
use crate::net::protocol::{DebugCounts, DebugOverlay, EntityView, Snapshot};

/// Ordered, duplicate-free view list
struct ViewList {
    seen: FxHashSet<EntityId>,
    views: Vec<EntityView>,
}

impl ViewList {
    fn new() -> Self {
        Self {
            seen: FxHashSet::default(),
            views: Vec::with_capacity(64),
        }
    }

    fn push(&mut self, view: EntityView) {
        if self.seen.insert(view.id) {
            self.views.push(view);
        }
    }

    fn contains(&self, id: &EntityId) -> bool {
        self.seen.contains(id)
    }
}

/// Live view of an indexed entry; `None` if it is gone or a dead player
fn resolve(registry: &Registry, entry: &SpatialEntry) -> Option<EntityView> {
    match entry.kind {
        EntityKind::Player => registry
            .players
            .read(&entry.id, |p| p.is_alive().then(|| EntityView::from_player(p)))
            .flatten(),
        EntityKind::Sentinel => registry.sentinels.read(&entry.id, EntityView::from_sentinel),
        EntityKind::Projectile => registry.projectiles.read(&entry.id, EntityView::from_projectile),
        _ => registry.statics().read(&entry.id, EntityView::from_entity),
    }
}

/// Build the snapshot for `id`; `None` if the player is not registered
pub fn build_snapshot(
    engine: &TickEngine,
    id: &EntityId,
    events: Vec<String>,
    effects: Vec<VisualEffect>,
) -> Option<Snapshot> {
    let registry = &engine.world().registry;
    let me = registry.players.get(id)?;
    let at = me.header.position;
    let mut list = ViewList::new();

    let range = view::RADIUS + spatial::QUERY_MARGIN;
    let mut candidates: Vec<SpatialEntry> = Vec::new();
    engine.dynamic_index().query(at.x, at.y, range, range, |e| candidates.push(*e));
    engine.static_index().query(at.x, at.y, range, range, |e| candidates.push(*e));
    for entry in &candidates {
        if list.contains(&entry.id) {
            continue;
        }
        if let Some(view) = resolve(registry, entry) {
            list.push(view);
        }
    }

    registry.players.for_each(|_, p| {
        if p.is_alive() {
            list.push(EntityView::from_player(p));
        }
    });
    registry.sentinels.for_each(|_, s| list.push(EntityView::from_sentinel(s)));

    let node_range = view::DATA_NODE_RADIUS;
    let mut nodes: Vec<SpatialEntry> = Vec::new();
    engine.static_index().query(at.x, at.y, node_range, node_range, |e| {
        if e.kind == EntityKind::DataNode {
            nodes.push(*e);
        }
    });
    for entry in &nodes {
        if list.contains(&entry.id) {
            continue;
        }
        if let Some(view) = resolve(registry, entry) {
            list.push(view);
        }
    }

    list.push(EntityView::from_player(&me));

    let debug = me.debug_overlay.then(|| DebugOverlay {
        dynamic_boundaries: engine.dynamic_index().boundaries(),
        static_boundaries: engine.static_index().boundaries(),
        tick: engine.tick_count(),
        counts: DebugCounts {
            objects: list.views.len(),
            sentinels: registry.sentinels.len(),
            projectiles: registry.projectiles.len(),
            players: registry.players.len(),
            statics: registry.static_count(),
        },
    });

    Some(Snapshot {
        objects: list.views,
        events,
        effects,
        debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, SimConfig};
    use crate::game::engine::World;
    use crate::game::entity::{DataNode, Entity, Meteorite, SentinelKind, Sentinel};
    use crate::util::clock::ManualClock;
    use crate::util::vec2::Vec2;
    use std::sync::Arc;
    use uuid::Uuid;

    fn engine() -> TickEngine {
        let world = Arc::new(World::new(3, Arc::new(ManualClock::new(10_000))));
        let config = SimConfig {
            seed: 3,
            sentinels_per_player: 0,
            generation: GenerationConfig::empty(),
            ..SimConfig::default()
        };
        TickEngine::new(world, &config)
    }

    fn place(engine: &TickEngine, name: &str, at: Vec2) -> EntityId {
        let world = engine.world();
        let id = Uuid::new_v4();
        world.add_player(id, name);
        world.registry.players.update(&id, |p| {
            p.respawn_at_ms = 0;
            p.header.position = at;
        });
        id
    }

    fn ids(snapshot: &Snapshot) -> Vec<EntityId> {
        snapshot.objects.iter().map(|v| v.id).collect()
    }

    #[test]
    fn test_unknown_player_has_no_snapshot() {
        let engine = engine();
        assert!(build_snapshot(&engine, &Uuid::new_v4(), vec![], vec![]).is_none());
    }

    #[test]
    fn test_view_radius_and_nodes() {
        let mut engine = engine();
        let me = place(&engine, "neo", Vec2::new(250.5, 250.5));
        let world = Arc::clone(engine.world());

        let near_rock = world.next_id();
        world.registry.insert_static(Entity::Meteorite(Meteorite::new(near_rock, Vec2::new(260.5, 250.5), None)));
        let far_rock = world.next_id();
        world.registry.insert_static(Entity::Meteorite(Meteorite::new(far_rock, Vec2::new(320.5, 250.5), None)));
        let far_node = world.next_id();
        world.registry.insert_static(Entity::DataNode(DataNode::new(far_node, Vec2::new(320.5, 250.5))));
        let very_far_node = world.next_id();
        world.registry.insert_static(Entity::DataNode(DataNode::new(very_far_node, Vec2::new(400.5, 250.5))));
        engine.reindex();

        let snap = build_snapshot(&engine, &me, vec![], vec![]).unwrap();
        let seen = ids(&snap);
        assert!(seen.contains(&near_rock));
        assert!(!seen.contains(&far_rock));
        assert!(seen.contains(&far_node));
        assert!(!seen.contains(&very_far_node));
        assert!(snap.debug.is_none());
    }

    #[test]
    fn test_radar_entries_and_no_duplicates() {
        let mut engine = engine();
        let me = place(&engine, "neo", Vec2::new(100.5, 100.5));
        let near = place(&engine, "trinity", Vec2::new(102.5, 100.5));
        let far = place(&engine, "smith", Vec2::new(450.5, 450.5));
        let dead = place(&engine, "cypher", Vec2::new(101.5, 101.5));

        let world = Arc::clone(engine.world());
        let boss = world.next_id();
        world.registry.sentinels.insert(boss, Sentinel::new(boss, SentinelKind::Null, Vec2::new(480.5, 20.5)));
        engine.reindex();
        world.registry.players.update(&dead, |p| {
            p.die(10_000);
        });

        let snap = build_snapshot(&engine, &me, vec!["line".into()], vec![]).unwrap();
        let seen = ids(&snap);
        let unique: FxHashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len());
        for id in [me, near, far, boss] {
            assert!(seen.contains(&id));
        }
        assert!(!seen.contains(&dead));
        assert_eq!(snap.events, vec!["line"]);
    }

    #[test]
    fn test_dead_requester_still_sees_self() {
        let mut engine = engine();
        let me = place(&engine, "neo", Vec2::new(100.5, 100.5));
        engine.reindex();
        engine.world().registry.players.update(&me, |p| {
            p.die(10_000);
        });

        let snap = build_snapshot(&engine, &me, vec![], vec![]).unwrap();
        assert_eq!(ids(&snap), vec![me]);
    }

    #[test]
    fn test_removed_static_skipped() {
        let mut engine = engine();
        let me = place(&engine, "neo", Vec2::new(100.5, 100.5));
        let world = Arc::clone(engine.world());
        let rock = world.next_id();
        world.registry.insert_static(Entity::Meteorite(Meteorite::new(rock, Vec2::new(101.5, 100.5), None)));
        engine.reindex();
        world.registry.remove_static(&rock);

        let snap = build_snapshot(&engine, &me, vec![], vec![]).unwrap();
        assert!(!ids(&snap).contains(&rock));
    }

    #[test]
    fn test_debug_overlay() {
        let mut engine = engine();
        let me = place(&engine, "neo", Vec2::new(100.5, 100.5));
        engine.world().registry.players.update(&me, |p| p.debug_overlay = true);
        engine.reindex();

        let snap = build_snapshot(&engine, &me, vec![], vec![]).unwrap();
        let debug = snap.debug.unwrap();
        assert!(!debug.dynamic_boundaries.is_empty());
        assert!(!debug.static_boundaries.is_empty());
        assert_eq!(debug.counts.players, 1);
        assert_eq!(debug.counts.objects, 1);
    }
}
