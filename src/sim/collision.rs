//! Axis-aligned collision detection
//!
//! A single overlap predicate shared by every game, plus a broad-phase that is
//! a plain pairwise scan over the entity store in insertion order.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityKind, EntityStore};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box from top-left corner and size
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    /// Half-open overlap on both axes. Boxes that only touch do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Horizontal overlap only
    #[inline]
    pub fn overlaps_x(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.max.x
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.max.y
    }
}

/// Every overlapping `(a, b)` pair with `a` of a kind in `kinds_a` and `b` of a
/// kind in `kinds_b`.
///
/// Pairs come out ordered by `a`'s insertion order, then `b`'s. Each unordered
/// pair is reported once, self-pairs and dead entities never.
pub fn detect_overlaps(
    store: &EntityStore,
    kinds_a: &[EntityKind],
    kinds_b: &[EntityKind],
) -> Vec<(EntityId, EntityId)> {
    let side_a: Vec<_> = store.alive_of(kinds_a).collect();
    let side_b: Vec<_> = store.alive_of(kinds_b).collect();

    let mut seen = BTreeSet::new();
    let mut pairs = Vec::new();
    for a in &side_a {
        let a_box = a.bounds();
        for b in &side_b {
            if a.id == b.id || !a_box.intersects(&b.bounds()) {
                continue;
            }
            let key = (a.id.min(b.id), a.id.max(b.id));
            if seen.insert(key) {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

/// Alive entities of the given kinds overlapping entity `id`, in insertion order.
/// Empty if `id` is unknown or dead.
pub fn overlapping(store: &EntityStore, id: EntityId, kinds: &[EntityKind]) -> Vec<EntityId> {
    let Ok(subject) = store.get(id) else {
        return Vec::new();
    };
    if !subject.alive {
        return Vec::new();
    }
    let bounds = subject.bounds();
    store
        .alive_of(kinds)
        .filter(|other| other.id != id && bounds.intersects(&other.bounds()))
        .map(|other| other.id)
        .collect()
}
