//! The scene: owner of entities and of every index over them.
//!
//! A host calls [`Scene::update`] and [`Scene::draw`] once per frame.
//!
//! # Update cascade
//!
//! 1. Advance the clock and `time_active`.
//! 2. Flush the entity list: commit queued adds (tags, tracker, `added`
//!    hooks), then queued removes (`removed` hooks, unregistration).
//! 3. Re-sort the entity order and any marked tag buckets by depth.
//! 4. Update every active entity in depth order. Each entity is taken out
//!    of storage while it runs, and whatever it changed in tags, depth or
//!    components is synced into the indexes right after.
//!
//! Adding or removing entities never takes effect mid-pass; it waits for
//! the next flush.
//!
//! # Draw cascade
//!
//! Visible entities draw in depth order. Their component lists refuse
//! structural changes for the duration.
//!
//! # Queries
//!
//! Collision queries run against a [`Targets`] set: a tag bucket, a
//! tracked entity kind, the owners of a tracked component type, or every
//! entity.
//!
//! ```ignore
//! let solid = scene.collide_check(player, SOLID)?;
//! let bat = scene.collide_first(player, Targets::kind::<Bat>())?;
//! let ahead = scene.collide_all_outside(player, Targets::kind::<Enemy>(), next)?;
//! let landing = scene.line_walk_check(from, to, SOLID, 1.0)?;
//! ```

pub mod context;

use std::any::{TypeId, type_name};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::trace;

use crate::components::Component;
use crate::entity::{Entity, IndexChange};
use crate::error::{CoreError, CoreResult};
use crate::math::Vec2;
use crate::resources::deferred::FlushTarget;
use crate::resources::entitylist::{DepthLedger, EntityId, EntityList};
use crate::resources::gameconfig::SceneConfig;
use crate::resources::taglist::{Tag, TagLists};
use crate::resources::tracker::{ComponentHandle, Tracker, TrackerRegistry};
use crate::resources::worldtime::WorldTime;
use crate::scene::context::UpdateContext;
use crate::systems::collision::{self, Probe};
use crate::systems::render::Canvas;

/// The entities a scene-level collision query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Targets {
    /// Every live entity.
    All,
    Tag(Tag),
    /// A tracked entity kind or family.
    Kind(TypeId, &'static str),
    /// Owners of a tracked component type, once per component.
    Component(TypeId, &'static str),
}

impl Targets {
    pub fn kind<K: 'static>() -> Self {
        Targets::Kind(TypeId::of::<K>(), type_name::<K>())
    }

    pub fn component<C: 'static>() -> Self {
        Targets::Component(TypeId::of::<C>(), type_name::<C>())
    }
}

impl From<Tag> for Targets {
    fn from(tag: Tag) -> Self {
        Targets::Tag(tag)
    }
}

enum TargetIds<'a> {
    Ids(std::slice::Iter<'a, EntityId>),
    Handles(std::slice::Iter<'a, ComponentHandle>),
}

impl Iterator for TargetIds<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        match self {
            TargetIds::Ids(ids) => ids.next().copied(),
            TargetIds::Handles(handles) => handles.next().map(|h| h.entity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScenePhase {
    Idle,
    Updating,
    Drawing,
}

impl ScenePhase {
    fn name(self) -> &'static str {
        match self {
            ScenePhase::Idle => "idle",
            ScenePhase::Updating => "updating",
            ScenePhase::Drawing => "drawing",
        }
    }
}

/// Tag buckets, tracker buckets and depth bookkeeping, kept apart from the
/// entity storage so both can be borrowed at once.
pub(crate) struct SceneIndex {
    tags: TagLists,
    tracker: Tracker,
    depths: DepthLedger,
}

impl SceneIndex {
    /// Applies what a live entity recorded since its last sync.
    fn sync(&mut self, entity: &mut Entity) {
        let Some(id) = entity.id() else {
            return;
        };
        if !entity.is_live() {
            return;
        }
        for change in entity.take_outbox() {
            match change {
                IndexChange::Tagged(tag) => self.tags.add(tag, id),
                IndexChange::Untagged(tag) => self.tags.remove(tag, id),
                IndexChange::Depth => {
                    let actual = self.depths.assign(entity.depth());
                    entity.set_actual_depth(actual);
                    for &tag in entity.tags() {
                        self.tags.mark_unsorted(tag);
                    }
                }
            }
        }
        for change in entity.components_mut().drain_journal() {
            let handle = ComponentHandle {
                entity: id,
                component: change.id,
            };
            if change.added {
                self.tracker.component_added(handle, change.type_id);
            } else {
                self.tracker.component_removed(handle, change.type_id);
            }
        }
    }
}

/// Mutable access to a stored entity. Tag, depth and component changes
/// made through it reach the scene indexes when it drops.
pub struct EntityMut<'a> {
    entity: &'a mut Entity,
    index: &'a mut SceneIndex,
}

impl Deref for EntityMut<'_> {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &*self.entity
    }
}

impl DerefMut for EntityMut<'_> {
    fn deref_mut(&mut self) -> &mut Entity {
        &mut *self.entity
    }
}

impl Drop for EntityMut<'_> {
    fn drop(&mut self) {
        self.index.sync(&mut *self.entity);
    }
}

pub struct Scene {
    entities: EntityList,
    index: SceneIndex,
    time: WorldTime,
    time_active: f32,
    phase: ScenePhase,
    helper: EntityId,
    config: SceneConfig,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// A scene tracking what the installed global registry declares.
    pub fn new() -> Self {
        Self::with_registry(TrackerRegistry::global(), SceneConfig::default())
    }

    pub fn with_registry(registry: Arc<TrackerRegistry>, config: SceneConfig) -> Self {
        let mut entities = EntityList::new();
        let helper = entities.insert(Entity::new(Vec2::ZERO));
        let mut scene = Self {
            entities,
            index: SceneIndex {
                tags: TagLists::new(),
                tracker: Tracker::new(registry, config.contract_checks),
                depths: DepthLedger::new(config.depth_epsilon),
            },
            time: WorldTime::default(),
            time_active: 0.0,
            phase: ScenePhase::Idle,
            helper,
            config,
        };
        scene.update_lists();
        scene
    }

    pub fn config(&self) -> SceneConfig {
        self.config
    }

    /// Always-present entity for scene-wide components.
    pub fn helper(&self) -> EntityId {
        self.helper
    }

    pub fn time(&self) -> &WorldTime {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut WorldTime {
        &mut self.time
    }

    /// Scaled seconds accumulated over every update.
    pub fn time_active(&self) -> f32 {
        self.time_active
    }

    // ==================== ENTITIES ====================

    /// Queues `entity` to go live at the next update.
    pub fn add(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    pub fn add_all(&mut self, entities: impl IntoIterator<Item = Entity>) -> Vec<EntityId> {
        entities.into_iter().map(|e| self.add(e)).collect()
    }

    /// Queues `id` for removal at the next update. An entity still waiting
    /// to be added is dropped without ever going live.
    pub fn remove(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.request_remove(id) {
            trace!("dropped {} before it went live", entity.kind_name());
        }
    }

    pub fn entities(&self) -> &EntityList {
        &self.entities
    }

    /// A stored entity, live or pending. `None` while it runs its own hooks.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<EntityMut<'_>> {
        let entity = self.entities.get_mut(id)?;
        Some(EntityMut {
            entity,
            index: &mut self.index,
        })
    }

    /// Live entities carrying `tag`, in depth order as of the last sort.
    pub fn tagged(&self, tag: Tag) -> &[EntityId] {
        self.index.tags.get(tag)
    }

    pub fn tagged_entities(&self, tag: Tag) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.resolve(self.index.tags.get(tag))
    }

    pub fn tags(&self) -> &TagLists {
        &self.index.tags
    }

    pub fn tracker(&self) -> &Tracker {
        &self.index.tracker
    }

    /// Live entities in `K`'s tracker bucket.
    pub fn tracked<K: 'static>(&self) -> CoreResult<impl Iterator<Item = &Entity> + '_> {
        Ok(self.entities.resolve(self.index.tracker.entities::<K>()?))
    }

    /// Every tracked `C` with its owner.
    pub fn tracked_components<C: Component>(
        &self,
    ) -> CoreResult<impl Iterator<Item = (&Entity, &C)> + '_> {
        let handles = self.index.tracker.components::<C>()?;
        Ok(handles.iter().filter_map(move |handle| {
            let entity = self.entities.get(handle.entity)?;
            let component = entity.components().get_as::<C>(handle.component)?;
            Some((entity, component))
        }))
    }

    /// Entities in `targets`, skipping any that are out running a hook.
    pub fn targets(&self, targets: impl Into<Targets>) -> CoreResult<impl Iterator<Item = &Entity> + '_> {
        let ids = match targets.into() {
            Targets::All => TargetIds::Ids(self.entities.ids().iter()),
            Targets::Tag(tag) => TargetIds::Ids(self.index.tags.get(tag).iter()),
            Targets::Kind(ty, name) => {
                TargetIds::Ids(self.index.tracker.entity_bucket(ty, name)?.iter())
            }
            Targets::Component(ty, name) => {
                TargetIds::Handles(self.index.tracker.component_bucket(ty, name)?.iter())
            }
        };
        Ok(ids.filter_map(move |id| self.entities.get(id)))
    }

    // ==================== CASCADE ====================

    fn enter(&mut self, phase: ScenePhase, attempted: &'static str) -> CoreResult<()> {
        if self.phase != ScenePhase::Idle {
            return Err(CoreError::SceneBusy {
                attempted,
                busy: self.phase.name(),
            });
        }
        self.phase = phase;
        Ok(())
    }

    /// Runs one frame of `dt` unscaled seconds.
    pub fn update(&mut self, dt: f32) -> CoreResult<()> {
        self.enter(ScenePhase::Updating, "update")?;
        self.time.advance(dt);
        let delta = self.time.delta;
        self.time_active += delta;

        self.update_lists();

        // The committed order is fixed until the next flush.
        for index in 0..self.entities.len() {
            let Some(id) = self.entities.id_at(index) else {
                continue;
            };
            let Some(mut entity) = self.entities.take(id) else {
                continue;
            };
            if entity.active {
                entity.update(self, delta);
            }
            self.index.sync(&mut entity);
            self.entities.restore(id, entity);
        }

        self.phase = ScenePhase::Idle;
        Ok(())
    }

    pub fn draw(&mut self, canvas: &mut dyn Canvas) -> CoreResult<()> {
        self.enter(ScenePhase::Drawing, "draw")?;
        for index in 0..self.entities.len() {
            let Some(id) = self.entities.id_at(index) else {
                continue;
            };
            if let Some(entity) = self.entities.get_mut(id) {
                if entity.visible {
                    entity.draw(canvas);
                }
            }
        }
        self.phase = ScenePhase::Idle;
        Ok(())
    }

    /// Applies pending adds and removes and re-sorts right away instead of
    /// at the start of the next update.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.enter(ScenePhase::Updating, "flush")?;
        self.update_lists();
        self.phase = ScenePhase::Idle;
        Ok(())
    }

    fn update_lists(&mut self) {
        let flush = self.entities.drain();
        if !flush.is_empty() {
            let (adds, removes) = flush.counts();
            trace!("entity list flush: {adds} added, {removes} removed");
        }
        flush.apply_to(self);

        if self.entities.sort_if_needed(&mut self.index.depths) {
            trace!("entity list re-sorted");
        }
        let entities = &self.entities;
        let sorted = self.index.tags.sort_marked(|id| entities.actual_depth(id));
        if sorted > 0 {
            trace!("{sorted} tag lists re-sorted");
        }
    }

    // ==================== ENTITY COLLISION QUERIES ====================

    pub fn collide_check(&self, entity: &Entity, targets: impl Into<Targets>) -> CoreResult<bool> {
        collision::any(entity, self.targets(targets)?)
    }

    pub fn collide_check_at(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
    ) -> CoreResult<bool> {
        collision::any_at(entity, self.targets(targets)?, at)
    }

    /// Whether some target is not hit now but is hit with `entity` at `at`.
    pub fn collide_check_outside(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
    ) -> CoreResult<bool> {
        Ok(collision::first_outside(entity, self.targets(targets)?, at)?.is_some())
    }

    pub fn collide_first(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
    ) -> CoreResult<Option<&Entity>> {
        collision::first(entity, self.targets(targets)?)
    }

    pub fn collide_first_at(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
    ) -> CoreResult<Option<&Entity>> {
        collision::first_at(entity, self.targets(targets)?, at)
    }

    pub fn collide_first_outside(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
    ) -> CoreResult<Option<&Entity>> {
        collision::first_outside(entity, self.targets(targets)?, at)
    }

    pub fn collide_all(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
    ) -> CoreResult<Vec<&Entity>> {
        collision::all(entity, self.targets(targets)?)
    }

    pub fn collide_all_at(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
    ) -> CoreResult<Vec<&Entity>> {
        collision::all_at(entity, self.targets(targets)?, at)
    }

    pub fn collide_all_outside(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
    ) -> CoreResult<Vec<&Entity>> {
        collision::all_outside(entity, self.targets(targets)?, at)
    }

    pub fn collide_each<'s>(
        &'s self,
        entity: &Entity,
        targets: impl Into<Targets>,
        action: impl FnMut(&'s Entity),
    ) -> CoreResult<usize> {
        collision::each(entity, self.targets(targets)?, action)
    }

    pub fn collide_each_at<'s>(
        &'s self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
        action: impl FnMut(&'s Entity),
    ) -> CoreResult<usize> {
        collision::each_at(entity, self.targets(targets)?, at, action)
    }

    pub fn collide_each_outside<'s>(
        &'s self,
        entity: &Entity,
        targets: impl Into<Targets>,
        at: Vec2,
        action: impl FnMut(&'s Entity),
    ) -> CoreResult<usize> {
        collision::each_outside(entity, self.targets(targets)?, at, action)
    }

    /// The target nearest to `entity` by position.
    pub fn closest(
        &self,
        entity: &Entity,
        targets: impl Into<Targets>,
    ) -> CoreResult<Option<&Entity>> {
        Ok(collision::closest(entity, self.targets(targets)?))
    }

    pub fn closest_tagged(&self, entity: &Entity, tag: Tag) -> Option<&Entity> {
        collision::closest(entity, self.tagged_entities(tag))
    }

    // ==================== PROBE QUERIES ====================

    pub fn probe_check(&self, probe: impl Into<Probe>, targets: impl Into<Targets>) -> CoreResult<bool> {
        let probe = probe.into();
        Ok(self.targets(targets)?.any(|e| probe.hits(e)))
    }

    pub fn probe_first(
        &self,
        probe: impl Into<Probe>,
        targets: impl Into<Targets>,
    ) -> CoreResult<Option<&Entity>> {
        let probe = probe.into();
        Ok(self.targets(targets)?.find(|e| probe.hits(e)))
    }

    pub fn probe_all(
        &self,
        probe: impl Into<Probe>,
        targets: impl Into<Targets>,
    ) -> CoreResult<Vec<&Entity>> {
        let mut hits = Vec::new();
        self.probe_all_into(probe, targets, &mut hits)?;
        Ok(hits)
    }

    /// Appends every hit to `into`. Returns how many were appended.
    pub fn probe_all_into<'s>(
        &'s self,
        probe: impl Into<Probe>,
        targets: impl Into<Targets>,
        into: &mut Vec<&'s Entity>,
    ) -> CoreResult<usize> {
        let probe = probe.into();
        let before = into.len();
        into.extend(self.targets(targets)?.filter(|e| probe.hits(e)));
        Ok(into.len() - before)
    }

    pub fn probe_each<'s>(
        &'s self,
        probe: impl Into<Probe>,
        targets: impl Into<Targets>,
        mut action: impl FnMut(&'s Entity),
    ) -> CoreResult<usize> {
        let probe = probe.into();
        let mut hits = 0;
        for entity in self.targets(targets)?.filter(|e| probe.hits(e)) {
            action(entity);
            hits += 1;
        }
        Ok(hits)
    }

    /// Walks from `from` towards `to` in `precision`-sized steps and returns
    /// the last point before one that hits a target, or `to` when the way
    /// is clear. A zero-length walk or a non-positive step returns `from`.
    pub fn line_walk_check(
        &self,
        from: Vec2,
        to: Vec2,
        targets: impl Into<Targets>,
        precision: f32,
    ) -> CoreResult<Vec2> {
        let targets = targets.into();
        let length = from.distance(to);
        if length == 0.0 || precision <= 0.0 {
            return Ok(from);
        }
        let step = (to - from) / length * precision;
        let steps = (length / precision).floor() as u32;
        let mut prev = from;
        for i in 1..=steps {
            let at = from + step * i as f32;
            if self.probe_check(at, targets)? {
                return Ok(prev);
            }
            prev = at;
        }
        // The last step may fall short of `to`.
        if prev != to && self.probe_check(to, targets)? {
            return Ok(prev);
        }
        Ok(to)
    }
}

impl FlushTarget<EntityId> for Scene {
    fn commit_add(&mut self, id: EntityId) {
        if !self.entities.commit(id) {
            return;
        }
        let Some(mut entity) = self.entities.take(id) else {
            return;
        };
        let actual = self.index.depths.assign(entity.depth());
        entity.set_actual_depth(actual);
        entity.set_live(true);
        for &tag in entity.tags() {
            self.index.tags.add(tag, id);
        }
        self.index.tracker.entity_added(id, entity.kind_type());
        for (component, ty) in entity.components().entries() {
            self.index
                .tracker
                .component_added(ComponentHandle { entity: id, component }, ty);
        }
        entity.components_mut().attach_owner(id);

        entity.with_kind_taken(|kind, entity| {
            kind.added(&mut UpdateContext::new(entity, self, 0.0, None));
        });
        self.index.sync(&mut entity);
        self.entities.restore(id, entity);
    }

    fn commit_remove(&mut self, id: EntityId) {
        if !self.entities.contains(id) {
            return;
        }
        let Some(mut entity) = self.entities.take(id) else {
            return;
        };
        entity.with_kind_taken(|kind, entity| {
            kind.removed(&mut UpdateContext::new(entity, self, 0.0, None));
        });
        self.index.sync(&mut entity);

        for &tag in entity.tags() {
            self.index.tags.remove(tag, id);
        }
        self.index.tracker.entity_removed(id, entity.kind_type());
        for (component, ty) in entity.components().entries() {
            self.index
                .tracker
                .component_removed(ComponentHandle { entity: id, component }, ty);
        }
        entity.components_mut().detach_owner();
        entity.set_live(false);
        entity.set_id(None);
        self.entities.retire(id);
        trace!("retired {}", entity.kind_name());
    }
}
