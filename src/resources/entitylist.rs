//! Per-scene entity storage with deferred add/remove and depth ordering.
//!
//! Entities live in a generational [`SlotMap`]; an [`EntityId`] stays valid
//! until the entity is removed at a flush, and a stale id simply resolves to
//! nothing. Adds and removes are always queued (the list never applies a
//! change immediately) and are committed by the scene at the top of each
//! update.
//!
//! # Depth ordering
//!
//! Each committed entity gets an `actual_depth = depth + offset`, where the
//! offset grows by a small epsilon for every entity placed in the same
//! declared depth. The committed order is ascending `actual_depth`, so lower
//! depths come first and entities sharing a depth keep their insertion
//! order. Sorting is lazy: a depth change only marks the order dirty.

use std::ops::Index;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::entity::Entity;
use crate::resources::deferred::{ChangeQueue, Flush, Keyed, LockMode, RemoveOutcome};

new_key_type! {
    /// Generational handle of an entity added to a scene.
    pub struct EntityId;
}

impl Keyed for EntityId {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        *self
    }
}

/// Offset bookkeeping for deterministic depth ordering.
#[derive(Debug, Clone)]
pub struct DepthLedger {
    offsets: FxHashMap<i32, f64>,
    epsilon: f64,
    unsorted: bool,
}

impl DepthLedger {
    pub fn new(epsilon: f64) -> Self {
        Self {
            offsets: FxHashMap::default(),
            epsilon,
            unsorted: false,
        }
    }

    /// Next actual depth for `depth`. Every call for the same depth returns a
    /// strictly larger value than the last.
    pub fn assign(&mut self, depth: i32) -> f64 {
        let next = self.offsets.entry(depth).or_insert(0.0);
        let offset = *next;
        *next += self.epsilon;
        self.unsorted = true;
        f64::from(depth) + offset
    }

    pub fn mark_unsorted(&mut self) {
        self.unsorted = true;
    }

    fn take_unsorted(&mut self) -> bool {
        std::mem::take(&mut self.unsorted)
    }
}

struct EntitySlot {
    /// Empty while the entity is out running one of its hooks.
    entity: Option<Box<Entity>>,
    live: bool,
}

pub struct EntityList {
    storage: SlotMap<EntityId, EntitySlot>,
    committed: Vec<EntityId>,
    queue: ChangeQueue<EntityId>,
}

impl Default for EntityList {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityList {
    pub fn new() -> Self {
        Self {
            storage: SlotMap::with_key(),
            committed: Vec::new(),
            queue: ChangeQueue::new(LockMode::Locked),
        }
    }

    /// Stores `entity` and queues it for the next flush.
    pub(crate) fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.storage.insert_with_key(|id| {
            entity.set_id(Some(id));
            EntitySlot {
                entity: Some(Box::new(entity)),
                live: false,
            }
        });
        // Locked queues never apply on the spot and a fresh key is never
        // pending, so this only queues.
        let _ = self.queue.request_add(id, false);
        id
    }

    /// Queues `id` for removal. An entity that was never committed is
    /// dropped from storage right away and handed back.
    pub(crate) fn request_remove(&mut self, id: EntityId) -> Option<Box<Entity>> {
        let committed = self.contains(id);
        match self.queue.request_remove(id, committed) {
            Ok(RemoveOutcome::Cancelled(_)) => self.storage.remove(id).and_then(|slot| slot.entity),
            _ => None,
        }
    }

    pub(crate) fn drain(&mut self) -> Flush<EntityId> {
        self.queue.drain()
    }

    /// Makes a stored entity live at the end of the committed order.
    pub(crate) fn commit(&mut self, id: EntityId) -> bool {
        match self.storage.get_mut(id) {
            Some(slot) if !slot.live => {
                slot.live = true;
                self.committed.push(id);
                true
            }
            _ => false,
        }
    }

    /// Drops a committed entity from the order and from storage.
    pub(crate) fn retire(&mut self, id: EntityId) -> Option<Box<Entity>> {
        if let Some(index) = self.committed.iter().position(|&c| c == id) {
            self.committed.remove(index);
        }
        self.storage.remove(id).and_then(|slot| slot.entity)
    }

    /// Takes an entity out of its slot so it can run a hook with the rest of
    /// the scene borrowed.
    pub(crate) fn take(&mut self, id: EntityId) -> Option<Box<Entity>> {
        self.storage.get_mut(id).and_then(|slot| slot.entity.take())
    }

    pub(crate) fn restore(&mut self, id: EntityId, entity: Box<Entity>) {
        if let Some(slot) = self.storage.get_mut(id) {
            slot.entity = Some(entity);
        }
    }

    /// Re-sorts the committed order if any depth changed since the last
    /// sort. Returns whether a sort ran.
    pub(crate) fn sort_if_needed(&mut self, ledger: &mut DepthLedger) -> bool {
        if !ledger.take_unsorted() {
            return false;
        }
        let storage = &self.storage;
        self.committed
            .sort_by(|a, b| actual_depth(storage, *a).total_cmp(&actual_depth(storage, *b)));
        true
    }

    /// Number of committed entities.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Committed ids in depth order.
    pub fn ids(&self) -> &[EntityId] {
        &self.committed
    }

    pub fn id_at(&self, index: usize) -> Option<EntityId> {
        self.committed.get(index).copied()
    }

    /// Whether `id` is committed.
    pub fn contains(&self, id: EntityId) -> bool {
        self.storage.get(id).is_some_and(|slot| slot.live)
    }

    /// Whether `id` is waiting for the next flush to become live.
    pub fn is_pending(&self, id: EntityId) -> bool {
        self.queue.is_pending_add(id)
    }

    pub fn is_pending_removal(&self, id: EntityId) -> bool {
        self.queue.is_pending_remove(id)
    }

    /// Any stored entity, committed or pending.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.storage.get(id).and_then(|slot| slot.entity.as_deref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.storage.get_mut(id).and_then(|slot| slot.entity.as_deref_mut())
    }

    /// Committed entity at `index` in depth order.
    pub fn at(&self, index: usize) -> Option<&Entity> {
        self.id_at(index).and_then(|id| self.get(id))
    }

    /// Committed entities in depth order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.committed.iter().filter_map(move |&id| self.get(id))
    }

    /// Resolves ids to entities, skipping stale ones.
    pub fn resolve<'a>(
        &'a self,
        ids: impl IntoIterator<Item = &'a EntityId> + 'a,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        ids.into_iter().filter_map(move |&id| self.get(id))
    }

    pub fn actual_depth(&self, id: EntityId) -> f64 {
        actual_depth(&self.storage, id)
    }
}

impl Index<usize> for EntityList {
    type Output = Entity;

    /// Panics when `index` is past the committed entities.
    fn index(&self, index: usize) -> &Entity {
        match self.at(index) {
            Some(entity) => entity,
            None => panic!(
                "entity index {index} out of range for a list of {}",
                self.committed.len()
            ),
        }
    }
}

fn actual_depth(storage: &SlotMap<EntityId, EntitySlot>, id: EntityId) -> f64 {
    storage
        .get(id)
        .and_then(|slot| slot.entity.as_deref())
        .map_or(0.0, Entity::actual_depth)
}
