//! Per-entity ordered component container with the three-state lock.
//!
//! The list is **Open** outside the scene cascade, so adds and removes apply
//! at once. While the owning entity updates, the list is **Locked**: a
//! component may add or remove siblings (or itself) and the change waits
//! until the pass ends. While the entity draws, the list is in **Error**
//! mode and any structural change is refused with
//! [`CoreError::ListLocked`](crate::error::CoreError::ListLocked).
//!
//! When the owning entity is live in a scene, every committed add and
//! remove is also journaled so the scene can keep its tracker in step.

use std::any::TypeId;

use log::trace;

use crate::components::{Component, ComponentId};
use crate::error::CoreResult;
use crate::resources::deferred::{
    AddOutcome, ChangeQueue, FlushTarget, Keyed, LockMode, RemoveOutcome,
};
use crate::resources::entitylist::EntityId;

pub(crate) struct ComponentSlot {
    id: ComponentId,
    type_id: TypeId,
    active: bool,
    visible: bool,
    /// Empty only while the component runs one of its own hooks.
    component: Option<Box<dyn Component>>,
}

impl Keyed for ComponentSlot {
    type Key = ComponentId;

    fn key(&self) -> ComponentId {
        self.id
    }
}

/// A committed add or remove, recorded for the scene's tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ComponentChange {
    pub id: ComponentId,
    pub type_id: TypeId,
    pub added: bool,
}

pub struct ComponentList {
    slots: Vec<ComponentSlot>,
    queue: ChangeQueue<ComponentSlot>,
    owner: Option<EntityId>,
    journal: Vec<ComponentChange>,
}

impl Default for ComponentList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentList")
            .field("len", &self.slots.len())
            .field("mode", &self.queue.mode())
            .field("owner", &self.owner)
            .finish()
    }
}

impl ComponentList {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            queue: ChangeQueue::new(LockMode::Open),
            owner: None,
            journal: Vec::new(),
        }
    }

    pub fn lock_mode(&self) -> LockMode {
        self.queue.mode()
    }

    /// Adds a component. Returns its handle even when the add is deferred.
    pub fn add(&mut self, component: impl Component) -> CoreResult<ComponentId> {
        self.add_boxed(Box::new(component))
    }

    pub fn add_boxed(&mut self, component: Box<dyn Component>) -> CoreResult<ComponentId> {
        let id = ComponentId::next();
        let slot = ComponentSlot {
            id,
            type_id: (*component).as_any().type_id(),
            active: component.starts_active(),
            visible: component.starts_visible(),
            component: Some(component),
        };
        match self.queue.request_add(slot, false)? {
            AddOutcome::Apply(slot) => self.commit_add(slot),
            AddOutcome::Queued | AddOutcome::Ignored => {}
        }
        Ok(id)
    }

    /// Removes a component. A component still waiting to be added is
    /// dropped without ever being attached.
    pub fn remove(&mut self, id: ComponentId) -> CoreResult<()> {
        let committed = self.contains(id);
        match self.queue.request_remove(id, committed)? {
            RemoveOutcome::Apply => self.commit_remove(id),
            RemoveOutcome::Cancelled(_) | RemoveOutcome::Queued | RemoveOutcome::Ignored => {}
        }
        Ok(())
    }

    /// Number of committed components.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `id` is committed to this list.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.slots.iter().any(|slot| slot.id == id)
    }

    pub fn is_pending(&self, id: ComponentId) -> bool {
        self.queue.is_pending_add(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.slots.iter().map(|slot| slot.id)
    }

    fn slot(&self, id: ComponentId) -> Option<&ComponentSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    fn slot_mut(&mut self, id: ComponentId) -> Option<&mut ComponentSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    /// Committed components in order. A component that is currently running
    /// its own hook is skipped.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.slots.iter().filter_map(|slot| slot.component.as_deref())
    }

    pub fn get(&self, id: ComponentId) -> Option<&dyn Component> {
        self.slot(id).and_then(|slot| slot.component.as_deref())
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut (dyn Component + 'static)> {
        self.slot_mut(id)
            .and_then(|slot| slot.component.as_deref_mut())
    }

    /// Downcasts the component `id` to `T`.
    pub fn get_as<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.get(id).and_then(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn get_as_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.get_mut(id).and_then(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// First committed component of type `T`.
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.iter().find_map(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.component.as_deref_mut())
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Every committed component of type `T`.
    pub fn components<T: Component>(&self) -> impl Iterator<Item = &T> {
        self.iter().filter_map(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn is_active(&self, id: ComponentId) -> bool {
        self.slot(id).is_some_and(|slot| slot.active)
    }

    pub fn set_active(&mut self, id: ComponentId, active: bool) {
        if let Some(slot) = self.slot_mut(id) {
            slot.active = active;
        }
    }

    pub fn is_visible(&self, id: ComponentId) -> bool {
        self.slot(id).is_some_and(|slot| slot.visible)
    }

    pub fn set_visible(&mut self, id: ComponentId, visible: bool) {
        if let Some(slot) = self.slot_mut(id) {
            slot.visible = visible;
        }
    }

    /// Switches the lock mode, committing anything queued under the
    /// previous mode.
    pub(crate) fn set_lock_mode(&mut self, mode: LockMode) {
        let flush = self.queue.set_mode(mode);
        if !flush.is_empty() {
            let (adds, removes) = flush.counts();
            trace!("component list flush: {adds} added, {removes} removed");
        }
        flush.apply_to(self);
    }

    /// Takes the component at `index` out for a hook call, if the slot's
    /// flag allows it.
    pub(crate) fn take_at(
        &mut self,
        index: usize,
        want: impl Fn(bool, bool) -> bool,
    ) -> Option<(ComponentId, Box<dyn Component>)> {
        let slot = self.slots.get_mut(index)?;
        if !want(slot.active, slot.visible) {
            return None;
        }
        let component = slot.component.take()?;
        Some((slot.id, component))
    }

    /// Returns a component taken with [`take_at`](Self::take_at). The
    /// committed slots never move while the list is locked, so `index`
    /// still names the same slot.
    pub(crate) fn restore_at(&mut self, index: usize, component: Box<dyn Component>) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.component = Some(component);
        }
    }

    /// Marks the list as belonging to a live entity and tells every
    /// committed component.
    pub(crate) fn attach_owner(&mut self, owner: EntityId) {
        self.owner = Some(owner);
        self.journal.clear();
        for component in self.slots.iter_mut().filter_map(|s| s.component.as_deref_mut()) {
            component.entity_added(owner);
        }
    }

    pub(crate) fn detach_owner(&mut self) {
        if let Some(owner) = self.owner.take() {
            for component in self.slots.iter_mut().filter_map(|s| s.component.as_deref_mut()) {
                component.entity_removed(owner);
            }
        }
        self.journal.clear();
    }

    /// `(id, type)` of every committed component.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (ComponentId, TypeId)> + '_ {
        self.slots.iter().map(|slot| (slot.id, slot.type_id))
    }

    pub(crate) fn drain_journal(&mut self) -> std::vec::Drain<'_, ComponentChange> {
        self.journal.drain(..)
    }
}

impl FlushTarget<ComponentSlot> for ComponentList {
    fn commit_add(&mut self, mut slot: ComponentSlot) {
        if let Some(component) = slot.component.as_deref_mut() {
            component.added(self.owner);
        }
        if self.owner.is_some() {
            self.journal.push(ComponentChange {
                id: slot.id,
                type_id: slot.type_id,
                added: true,
            });
        }
        self.slots.push(slot);
    }

    fn commit_remove(&mut self, id: ComponentId) {
        let Some(index) = self.slots.iter().position(|slot| slot.id == id) else {
            return;
        };
        let mut slot = self.slots.remove(index);
        if let Some(component) = slot.component.as_deref_mut() {
            component.removed(self.owner);
        }
        if self.owner.is_some() {
            self.journal.push(ComponentChange {
                id,
                type_id: slot.type_id,
                added: false,
            });
        }
    }
}
