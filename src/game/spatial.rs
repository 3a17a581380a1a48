//! Region quadtree for range and first-match queries
//!
//! Two instances live in the tick engine: a dynamic tree rebuilt every tick
//! for players, sentinels and projectiles, and a static tree rebuilt only when
//! the static registry is dirty. Trees are owned by the tick thread and are
//! never shared.
//!
//! The tree filters by entry *position* only. Callers apply their own shape
//! test (usually AABB against AABB) on the returned entries.

use serde::{Deserialize, Serialize};

use crate::game::entity::{Entity, EntityId, EntityKind};
use crate::util::vec2::Vec2;

// ============================================================================
// Quadtree Constants
// ============================================================================

/// Nodes at this depth stop subdividing and grow past capacity
const MAX_DEPTH: u32 = 16;

/// Initial capacity for leaf vectors
const LEAF_INITIAL_CAPACITY: usize = 4;

/// Axis-aligned rectangle given by centre and half extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub half_w: f64,
    pub half_h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, half_w: f64, half_h: f64) -> Self {
        Self { x, y, half_w, half_h }
    }

    /// Square of half extent `half` around `center`
    pub fn around(center: Vec2, half: f64) -> Self {
        Self::new(center.x, center.y, half, half)
    }

    /// Inclusive on every edge
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x - self.half_w
            && p.x <= self.x + self.half_w
            && p.y >= self.y - self.half_h
            && p.y <= self.y + self.half_h
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x - other.half_w > self.x + self.half_w
            || other.x + other.half_w < self.x - self.half_w
            || other.y - other.half_h > self.y + self.half_h
            || other.y + other.half_h < self.y - self.half_h)
    }
}

/// Snapshot of an entity taken when the tree was built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub size: u32,
}

impl SpatialEntry {
    pub fn new(id: EntityId, kind: EntityKind, position: Vec2, size: u32) -> Self {
        Self { id, kind, position, size }
    }

    pub fn half_size(&self) -> f64 {
        self.size as f64 / 2.0
    }
}

impl From<&Entity> for SpatialEntry {
    fn from(entity: &Entity) -> Self {
        Self::new(entity.id(), entity.kind(), entity.position(), entity.size())
    }
}

/// Region quadtree node; the root is the whole tree
#[derive(Debug)]
pub struct QuadTree {
    boundary: Rect,
    capacity: usize,
    depth: u32,
    entries: Vec<SpatialEntry>,
    /// NW, NE, SW, SE
    children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    pub fn new(boundary: Rect, capacity: usize) -> Self {
        Self::with_depth(boundary, capacity.max(1), 0)
    }

    fn with_depth(boundary: Rect, capacity: usize, depth: u32) -> Self {
        Self {
            boundary,
            capacity,
            depth,
            entries: Vec::with_capacity(LEAF_INITIAL_CAPACITY),
            children: None,
        }
    }

    pub fn boundary(&self) -> Rect {
        self.boundary
    }

    /// Insert an entry; returns false if its position is outside this node
    pub fn insert(&mut self, entry: SpatialEntry) -> bool {
        if !self.boundary.contains(entry.position) {
            return false;
        }

        if self.children.is_none() {
            if self.entries.len() < self.capacity || self.depth >= MAX_DEPTH {
                self.entries.push(entry);
                return true;
            }
            self.subdivide();
        }

        self.insert_into_children(entry)
    }

    fn insert_into_children(&mut self, entry: SpatialEntry) -> bool {
        match self.children.as_mut() {
            Some(children) => children.iter_mut().any(|child| child.insert(entry)),
            None => false,
        }
    }

    fn subdivide(&mut self) {
        let Rect { x, y, half_w, half_h } = self.boundary;
        let w = half_w / 2.0;
        let h = half_h / 2.0;
        let depth = self.depth + 1;
        let cap = self.capacity;

        self.children = Some(Box::new([
            QuadTree::with_depth(Rect::new(x - w, y - h, w, h), cap, depth),
            QuadTree::with_depth(Rect::new(x + w, y - h, w, h), cap, depth),
            QuadTree::with_depth(Rect::new(x - w, y + h, w, h), cap, depth),
            QuadTree::with_depth(Rect::new(x + w, y + h, w, h), cap, depth),
        ]));

        for entry in std::mem::take(&mut self.entries) {
            self.insert_into_children(entry);
        }
    }

    /// Visit every entry whose position lies inside the query rectangle
    pub fn query<F>(&self, x: f64, y: f64, half_w: f64, half_h: f64, mut visit: F)
    where
        F: FnMut(&SpatialEntry),
    {
        let range = Rect::new(x, y, half_w, half_h);
        self.query_rect(&range, &mut visit);
    }

    fn query_rect<F>(&self, range: &Rect, visit: &mut F)
    where
        F: FnMut(&SpatialEntry),
    {
        if !self.boundary.intersects(range) {
            return;
        }

        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.query_rect(range, visit);
                }
            }
            None => {
                for entry in &self.entries {
                    if range.contains(entry.position) {
                        visit(entry);
                    }
                }
            }
        }
    }

    /// Square query of half extent `radius`, collected in traversal order
    pub fn query_radius(&self, center: Vec2, radius: f64) -> Vec<SpatialEntry> {
        let mut found = Vec::new();
        self.query(center.x, center.y, radius, radius, |e| found.push(*e));
        found
    }

    /// First entry inside the rectangle matching `predicate`, in NW, NE, SW, SE order
    pub fn find_first<P>(&self, x: f64, y: f64, half_w: f64, half_h: f64, mut predicate: P) -> Option<SpatialEntry>
    where
        P: FnMut(&SpatialEntry) -> bool,
    {
        let range = Rect::new(x, y, half_w, half_h);
        self.find_first_rect(&range, &mut predicate)
    }

    fn find_first_rect<P>(&self, range: &Rect, predicate: &mut P) -> Option<SpatialEntry>
    where
        P: FnMut(&SpatialEntry) -> bool,
    {
        if !self.boundary.intersects(range) {
            return None;
        }

        match &self.children {
            Some(children) => children
                .iter()
                .find_map(|child| child.find_first_rect(range, predicate)),
            None => self
                .entries
                .iter()
                .find(|e| range.contains(e.position) && predicate(*e))
                .copied(),
        }
    }

    /// Drop every entry and child, reverting to an empty leaf
    pub fn clear(&mut self) {
        self.entries.clear();
        self.children = None;
    }

    /// Every node's rectangle, parents before children
    pub fn boundaries(&self) -> Vec<Rect> {
        let mut out = Vec::new();
        self.collect_boundaries(&mut out);
        out
    }

    fn collect_boundaries(&self, out: &mut Vec<Rect>) {
        out.push(self.boundary);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_boundaries(out);
            }
        }
    }

    pub fn len(&self) -> usize {
        match &self.children {
            Some(children) => children.iter().map(QuadTree::len).sum(),
            None => self.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QuadTreeStats {
        let mut stats = QuadTreeStats::default();
        self.collect_stats(&mut stats);
        stats
    }

    fn collect_stats(&self, stats: &mut QuadTreeStats) {
        stats.nodes += 1;
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.collect_stats(stats);
                }
            }
            None => {
                stats.leaves += 1;
                stats.entries += self.entries.len();
            }
        }
    }
}

/// Quadtree statistics for debugging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadTreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub entries: usize,
    pub max_depth: u32,
}
