//! Concurrent entity registry
//!
//! Connection threads insert, remove and mutate players while the tick thread
//! iterates every collection. Each collection is a lock-striped map: keys hash
//! to one of several `RwLock`ed shards, so a write on one connection only
//! blocks readers of the same shard.
//!
//! Iteration helpers lock one shard at a time. They are not linearizable with
//! concurrent writers but always see a consistent shard.
//!
//! Closures passed to [`ShardedMap::read`] and [`ShardedMap::update`] run under
//! a shard lock and must not call back into the registry.

use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::game::entity::{Entity, EntityId, Player, Projectile, Sentinel};

/// Default shard count; a power of two so the shard index is a mask
pub const DEFAULT_SHARDS: usize = 16;

/// Lock-striped hash map
pub struct ShardedMap<K, V> {
    shards: Box<[RwLock<HashMap<K, V, FxBuildHasher>>]>,
    hasher: FxBuildHasher,
}

impl<K, V> ShardedMap<K, V>
where
    K: Eq + Hash + Copy,
{
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let count = count.max(1).next_power_of_two();
        let shards = (0..count)
            .map(|_| RwLock::new(HashMap::with_hasher(FxBuildHasher)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: FxBuildHasher,
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &RwLock<HashMap<K, V, FxBuildHasher>> {
        let index = (self.hasher.hash_one(key) as usize) & (self.shards.len() - 1);
        &self.shards[index]
    }

    /// Insert or replace, returning the previous value
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.shard(&key).write().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).write().remove(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Run `f` against the value under a read lock
    pub fn read<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.shard(key).read().get(key).map(f)
    }

    /// Run `f` against the value under a write lock
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.shard(key).write().get_mut(key).map(f)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.read().keys().copied());
        }
        out
    }

    /// Visit every entry, one shard lock at a time
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for shard in self.shards.iter() {
            for (k, v) in shard.read().iter() {
                f(k, v);
            }
        }
    }

    /// Mutate every entry, one shard lock at a time
    pub fn for_each_mut(&self, mut f: impl FnMut(&K, &mut V)) {
        for shard in self.shards.iter() {
            for (k, v) in shard.write().iter_mut() {
                f(k, v);
            }
        }
    }

    /// First `Some` produced by `f`, in shard order
    pub fn find_map<R>(&self, mut f: impl FnMut(&K, &V) -> Option<R>) -> Option<R> {
        for shard in self.shards.iter() {
            let guard = shard.read();
            if let Some(found) = guard.iter().find_map(|(k, v)| f(k, v)) {
                return Some(found);
            }
        }
        None
    }

    /// Count entries matching `pred`
    pub fn count(&self, mut pred: impl FnMut(&V) -> bool) -> usize {
        let mut n = 0;
        self.for_each(|_, v| {
            if pred(v) {
                n += 1;
            }
        });
        n
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
    }
}

impl<K, V> ShardedMap<K, V>
where
    K: Eq + Hash + Copy,
    V: Clone,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.read(key, V::clone)
    }

    /// Cloned snapshot of every value
    pub fn values(&self) -> Vec<V> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.read().values().cloned());
        }
        out
    }
}

impl<K, V> Default for ShardedMap<K, V>
where
    K: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All live entities, grouped by category
#[derive(Default)]
pub struct Registry {
    pub players: ShardedMap<EntityId, Player>,
    pub sentinels: ShardedMap<EntityId, Sentinel>,
    pub projectiles: ShardedMap<EntityId, Projectile>,
    /// Meteorites, ore, data nodes and landmarks
    statics: ShardedMap<EntityId, Entity>,
    static_dirty: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static object and mark the static index stale
    pub fn insert_static(&self, entity: Entity) {
        self.statics.insert(entity.id(), entity);
        self.static_dirty.store(true, Ordering::Release);
    }

    /// Remove a static object; marks the index stale only if something was removed
    pub fn remove_static(&self, id: &EntityId) -> Option<Entity> {
        let removed = self.statics.remove(id);
        if removed.is_some() {
            self.static_dirty.store(true, Ordering::Release);
        }
        removed
    }

    /// Mutate a static object in place; position changes are not allowed here
    pub fn update_static<R>(&self, id: &EntityId, f: impl FnOnce(&mut Entity) -> R) -> Option<R> {
        self.statics.update(id, f)
    }

    pub fn get_static(&self, id: &EntityId) -> Option<Entity> {
        self.statics.get(id)
    }

    pub fn statics(&self) -> &ShardedMap<EntityId, Entity> {
        &self.statics
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    /// Consume the dirty flag
    pub fn take_static_dirty(&self) -> bool {
        self.static_dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_static_dirty(&self) -> bool {
        self.static_dirty.load(Ordering::Acquire)
    }

    /// First player whose name matches case-insensitively
    pub fn find_player_by_name(&self, name: &str) -> Option<EntityId> {
        self.players.find_map(|id, p| p.header.name.eq_ignore_ascii_case(name).then_some(*id))
    }
}
