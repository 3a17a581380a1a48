//! Drain-once event and effect queues
//!
//! Global log lines and visual effects go through crossbeam channels so any
//! thread can publish without blocking the tick. Private lines are kept per
//! recipient in the sharded registry map. The broadcaster drains everything
//! exactly once per cycle.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::game::entity::EntityId;
use crate::game::registry::ShardedMap;
use crate::util::vec2::Vec2;

/// Kind tag of a transient visual effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectKind {
    Hit,
    Explosion,
    Debris,
    ProjectileDeath,
    Collect,
}

/// One transient visual effect record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEffect {
    pub kind: EffectKind,
    pub x: f64,
    pub y: f64,
    pub target: Option<Vec2>,
    pub color: String,
    pub size: Option<u32>,
    pub message: Option<String>,
}

impl VisualEffect {
    pub fn new(kind: EffectKind, at: Vec2, color: &str) -> Self {
        Self {
            kind,
            x: at.x,
            y: at.y,
            target: None,
            color: color.to_string(),
            size: None,
            message: None,
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

/// Log lines and effects waiting for the next broadcast
pub struct EventQueues {
    global_tx: Sender<String>,
    global_rx: Receiver<String>,
    effects_tx: Sender<VisualEffect>,
    effects_rx: Receiver<VisualEffect>,
    private: ShardedMap<EntityId, Vec<String>>,
}

impl EventQueues {
    pub fn new() -> Self {
        let (global_tx, global_rx) = unbounded();
        let (effects_tx, effects_rx) = unbounded();
        Self {
            global_tx,
            global_rx,
            effects_tx,
            effects_rx,
            private: ShardedMap::new(),
        }
    }

    /// Create the private queue for a newly connected recipient
    pub fn register(&self, id: EntityId) {
        self.private.insert(id, Vec::new());
    }

    /// Drop a disconnected recipient's private queue and anything still in it
    pub fn unregister(&self, id: &EntityId) {
        self.private.remove(id);
    }

    /// Line broadcast to everyone
    pub fn global(&self, line: impl Into<String>) {
        // Receiver lives as long as self, so send cannot fail
        let _ = self.global_tx.send(line.into());
    }

    /// Line delivered only to `to`; dropped if the recipient is unknown
    pub fn private(&self, to: &EntityId, line: impl Into<String>) {
        let line = line.into();
        self.private.update(to, move |queue| queue.push(line));
    }

    pub fn effect(&self, effect: VisualEffect) {
        let _ = self.effects_tx.send(effect);
    }

    pub fn drain_global(&self) -> Vec<String> {
        self.global_rx.try_iter().collect()
    }

    pub fn drain_private(&self, id: &EntityId) -> Vec<String> {
        self.private.update(id, std::mem::take).unwrap_or_default()
    }

    pub fn drain_effects(&self) -> Vec<VisualEffect> {
        self.effects_rx.try_iter().collect()
    }

    pub fn pending_global(&self) -> usize {
        self.global_rx.len()
    }

    pub fn pending_effects(&self) -> usize {
        self.effects_rx.len()
    }
}

impl Default for EventQueues {
    fn default() -> Self {
        Self::new()
    }
}
