//! Entity records and the store that owns them
//!
//! Entities are kept in a single vector ordered by id. Ids are allocated
//! monotonically, so id order is insertion order and iteration is stable.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::error::SimError;

/// Stable handle to an entity in an [`EntityStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an entity is, used for collision filters and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    Projectile,
    Obstacle,
    Pickup,
}

/// A positioned, sized body in the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Top-left corner
    pub pos: Vec2,
    pub vel: Vec2,
    /// Width and height
    pub size: Vec2,
    pub alive: bool,
    /// Entity this one rides on or belongs to (e.g. the platform an enemy patrols)
    #[serde(default)]
    pub anchor: Option<EntityId>,
}

impl Entity {
    /// Build an unstored entity. The id is assigned by [`EntityStore::add`].
    pub fn new(kind: EntityKind, pos: Vec2, size: Vec2) -> Self {
        Self {
            id: EntityId(0),
            kind,
            pos,
            vel: Vec2::ZERO,
            size,
            alive: true,
            anchor: None,
        }
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn anchored_to(mut self, anchor: EntityId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    /// Right edge (x + width)
    #[inline]
    pub fn right(&self) -> f32 {
        self.bounds().right()
    }

    /// Bottom edge (y + height)
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.bounds().bottom()
    }
}

/// Snapshot of alive entities. Detached from the store, so the caller may
/// mutate the store while holding it; clone it to iterate again.
pub type AliveSnapshot = std::vec::IntoIter<Entity>;

/// Exclusive owner of every entity in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore {
    /// Sorted by id
    entities: Vec<Entity>,
    next_id: u32,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Insert an entity and return its freshly allocated id
    pub fn add(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        self.entities.push(entity);
        id
    }

    /// Remove an entity immediately. Unknown ids are ignored.
    pub fn remove(&mut self, id: EntityId) {
        if let Ok(index) = self.index_of(id) {
            self.entities.remove(index);
        }
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity, SimError> {
        self.index_of(id)
            .map(|index| &self.entities[index])
            .map_err(|_| SimError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity, SimError> {
        match self.index_of(id) {
            Ok(index) => Ok(&mut self.entities[index]),
            Err(_) => Err(SimError::NotFound(id)),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_ok()
    }

    /// Mark an entity dead. It drops out of queries at once and is removed by
    /// the next [`reap`](Self::reap). Returns false if the id is unknown.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.get_mut(id) {
            Ok(entity) => {
                entity.alive = false;
                true
            }
            Err(_) => false,
        }
    }

    /// Drop every dead entity, returning how many were removed
    pub fn reap(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| e.alive);
        before - self.entities.len()
    }

    /// Remove every entity matching `predicate`, returning the removed records in order
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Entity) -> bool) -> Vec<Entity> {
        let mut removed = Vec::new();
        self.entities.retain(|e| {
            if predicate(e) {
                removed.push(*e);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Alive entities, optionally filtered by kind, in insertion order
    pub fn for_each_alive(&self, kind: Option<EntityKind>) -> AliveSnapshot {
        self.entities
            .iter()
            .filter(|e| e.alive && kind.is_none_or(|k| e.kind == k))
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Alive entities whose kind is in `kinds`, in insertion order
    pub fn alive_of(&self, kinds: &[EntityKind]) -> AliveSnapshot {
        self.entities
            .iter()
            .filter(|e| e.alive && kinds.contains(&e.kind))
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// First alive entity whose anchor is missing from the store
    pub fn dangling_anchor(&self) -> Option<(EntityId, EntityId)> {
        self.entities
            .iter()
            .filter(|e| e.alive)
            .find_map(|e| e.anchor.filter(|a| !self.contains(*a)).map(|a| (e.id, a)))
    }

    /// Every stored entity, dead ones included
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop everything and restart id allocation
    pub fn clear(&mut self) {
        self.entities.clear();
        self.next_id = 1;
    }

    fn index_of(&self, id: EntityId) -> Result<usize, usize> {
        self.entities.binary_search_by_key(&id, |e| e.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(kind: EntityKind, x: f32) -> Entity {
        Entity::new(kind, Vec2::new(x, 0.0), Vec2::splat(10.0))
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut store = EntityStore::new();
        let a = store.add(block(EntityKind::Player, 0.0));
        let b = store.add(block(EntityKind::Enemy, 20.0));
        assert!(a < b);
        assert_eq!(store.get(a).unwrap().kind, EntityKind::Player);
        assert_eq!(store.get(b).unwrap().id, b);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut store = EntityStore::new();
        let a = store.add(block(EntityKind::Player, 0.0));
        store.remove(a);
        store.remove(a);
        store.remove(EntityId(999));
        assert!(store.is_empty());
        assert_eq!(store.get(a), Err(SimError::NotFound(a)));
    }

    #[test]
    fn test_killed_entities_leave_queries_until_reaped() {
        let mut store = EntityStore::new();
        let a = store.add(block(EntityKind::Enemy, 0.0));
        let b = store.add(block(EntityKind::Enemy, 20.0));
        assert!(store.kill(a));

        let alive: Vec<_> = store.for_each_alive(Some(EntityKind::Enemy)).map(|e| e.id).collect();
        assert_eq!(alive, vec![b]);
        // Still addressable until the end-of-tick reap
        assert!(store.get(a).is_ok());

        assert_eq!(store.reap(), 1);
        assert!(store.get(a).is_err());
        assert!(!store.kill(a));
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let mut store = EntityStore::new();
        let ids: Vec<_> = (0..4)
            .map(|i| store.add(block(EntityKind::Obstacle, i as f32 * 20.0)))
            .collect();

        let snapshot = store.for_each_alive(None);
        for entity in snapshot.clone() {
            store.remove(entity.id);
        }
        assert!(store.is_empty());
        // Restartable: the clone was consumed, the original still yields everything
        let seen: Vec<_> = snapshot.map(|e| e.id).collect();
        assert_eq!(seen, ids);
    }

    #[test]
    fn test_kind_filter() {
        let mut store = EntityStore::new();
        store.add(block(EntityKind::Player, 0.0));
        let e = store.add(block(EntityKind::Enemy, 0.0));
        store.add(block(EntityKind::Pickup, 0.0));

        let enemies: Vec<_> = store.for_each_alive(Some(EntityKind::Enemy)).collect();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].id, e);
        assert_eq!(store.alive_of(&[EntityKind::Enemy, EntityKind::Pickup]).len(), 2);
    }

    #[test]
    fn test_dangling_anchor() {
        let mut store = EntityStore::new();
        let platform = store.add(block(EntityKind::Obstacle, 0.0));
        let rider = store.add(block(EntityKind::Enemy, 0.0).anchored_to(platform));
        assert_eq!(store.dangling_anchor(), None);

        store.remove(platform);
        assert_eq!(store.dangling_anchor(), Some((rider, platform)));

        // Dead riders are about to be reaped and do not count
        store.kill(rider);
        assert_eq!(store.dangling_anchor(), None);
    }

    #[test]
    fn test_clear_restarts_ids() {
        let mut store = EntityStore::new();
        let first = store.add(block(EntityKind::Player, 0.0));
        store.add(block(EntityKind::Enemy, 0.0));
        store.clear();
        assert_eq!(store.add(block(EntityKind::Player, 0.0)), first);
    }

    proptest! {
        #[test]
        fn prop_removed_ids_are_unreachable(
            count in 1usize..40,
            removals in proptest::collection::vec(0usize..40, 0..20),
        ) {
            let mut store = EntityStore::new();
            let ids: Vec<_> = (0..count)
                .map(|i| store.add(block(EntityKind::Obstacle, i as f32)))
                .collect();

            let mut removed = Vec::new();
            for index in removals {
                if let Some(&id) = ids.get(index) {
                    store.remove(id);
                    removed.push(id);
                }
            }

            let alive: Vec<_> = store.for_each_alive(None).map(|e| e.id).collect();
            for id in &removed {
                prop_assert!(store.get(*id).is_err());
                prop_assert!(!alive.contains(id));
            }
            // Insertion order is preserved
            prop_assert!(alive.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(alive.len() + removed.iter().collect::<std::collections::BTreeSet<_>>().len(), count);
        }
    }
}
