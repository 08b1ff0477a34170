//! Type-indexed membership lists for entities and components.
//!
//! The tracker answers "every live entity of kind X" or "every attached
//! component of type Y" without scanning the scene.
//!
//! # How It Works
//!
//! 1. At startup, build a [`TrackerRegistry`] with explicit declarations:
//!    which entity kinds and component types get a bucket, and which types
//!    also report into another type's bucket (a "family" such as every
//!    enemy kind reporting into an `Enemy` marker bucket).
//! 2. Every [`Scene`](crate::scene::Scene) owns a [`Tracker`] built from
//!    that registry, with one empty bucket per declared type.
//! 3. When an entity or component goes live, its concrete type is looked
//!    up in the registry and its handle is appended to every bucket the type
//!    reports into; removal undoes exactly that.
//!
//! # Usage
//!
//! ```ignore
//! struct Enemy; // family marker, never instantiated
//!
//! let registry = TrackerRegistry::builder()
//!     .entity::<Player>()
//!     .entity::<Bat>()
//!     .entity_into::<Bat, Enemy>()
//!     .entity_into::<Slime, Enemy>()
//!     .component::<Coroutine>()
//!     .build();
//!
//! let bats = scene.tracker().entities::<Bat>()?;
//! let enemies = scene.tracker().entities::<Enemy>()?; // bats and slimes
//! ```
//!
//! Querying a type with no bucket is a contract violation: it fails with
//! [`CoreError::Untracked`] while contract checks are on, and quietly
//! yields nothing while they are off.

use std::any::{TypeId, type_name};
use std::sync::{Arc, OnceLock};

use log::info;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::{Component, ComponentId};
use crate::entity::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::resources::entitylist::EntityId;

type Routes = FxHashMap<TypeId, SmallVec<[TypeId; 2]>>;

static GLOBAL: OnceLock<Arc<TrackerRegistry>> = OnceLock::new();

/// Static description of which types are tracked and where they report.
#[derive(Debug, Default, Clone)]
pub struct TrackerRegistry {
    entity_routes: Routes,
    component_routes: Routes,
    entity_buckets: FxHashMap<TypeId, &'static str>,
    component_buckets: FxHashMap<TypeId, &'static str>,
}

impl TrackerRegistry {
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::default()
    }

    /// Installs `self` as the process-wide registry used by
    /// [`Scene::new`](crate::scene::Scene::new). Only the first install
    /// succeeds.
    pub fn install(self) -> CoreResult<Arc<TrackerRegistry>> {
        let registry = Arc::new(self);
        GLOBAL
            .set(Arc::clone(&registry))
            .map_err(|_| CoreError::RegistryInstalled)?;
        Ok(registry)
    }

    /// The installed registry, or an empty one.
    pub fn global() -> Arc<TrackerRegistry> {
        GLOBAL.get().cloned().unwrap_or_default()
    }

    pub fn tracks_entity<T: 'static>(&self) -> bool {
        self.entity_buckets.contains_key(&TypeId::of::<T>())
    }

    pub fn tracks_component<T: 'static>(&self) -> bool {
        self.component_buckets.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn entity_routes(&self, kind: TypeId) -> &[TypeId] {
        self.entity_routes
            .get(&kind)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn component_routes(&self, kind: TypeId) -> &[TypeId] {
        self.component_routes
            .get(&kind)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }
}

fn route(routes: &mut Routes, from: TypeId, into: TypeId) {
    let targets = routes.entry(from).or_default();
    if !targets.contains(&into) {
        targets.push(into);
    }
}

#[derive(Debug, Default)]
pub struct TrackerBuilder {
    registry: TrackerRegistry,
}

impl TrackerBuilder {
    /// Gives entity kind `K` its own bucket.
    pub fn entity<K: EntityKind>(self) -> Self {
        self.entity_into::<K, K>()
    }

    /// Makes entities of kind `K` also report into `Family`'s bucket.
    /// `Family` needs no instances of its own; a plain marker type works.
    pub fn entity_into<K: EntityKind, Family: 'static>(mut self) -> Self {
        let family = TypeId::of::<Family>();
        self.registry
            .entity_buckets
            .insert(family, type_name::<Family>());
        route(&mut self.registry.entity_routes, TypeId::of::<K>(), family);
        self
    }

    pub fn component<C: Component>(self) -> Self {
        self.component_into::<C, C>()
    }

    pub fn component_into<C: Component, Family: 'static>(mut self) -> Self {
        let family = TypeId::of::<Family>();
        self.registry
            .component_buckets
            .insert(family, type_name::<Family>());
        route(&mut self.registry.component_routes, TypeId::of::<C>(), family);
        self
    }

    pub fn build(self) -> TrackerRegistry {
        info!(
            "Tracker registry: {} entity buckets, {} component buckets",
            self.registry.entity_buckets.len(),
            self.registry.component_buckets.len()
        );
        self.registry
    }
}

/// A tracked component: the entity it is attached to and its id there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    pub entity: EntityId,
    pub component: ComponentId,
}

/// Per-scene live buckets.
#[derive(Debug)]
pub struct Tracker {
    registry: Arc<TrackerRegistry>,
    entities: FxHashMap<TypeId, Vec<EntityId>>,
    components: FxHashMap<TypeId, Vec<ComponentHandle>>,
    checks: bool,
}

impl Tracker {
    pub fn new(registry: Arc<TrackerRegistry>, checks: bool) -> Self {
        let entities = registry
            .entity_buckets
            .keys()
            .map(|&ty| (ty, Vec::new()))
            .collect();
        let components = registry
            .component_buckets
            .keys()
            .map(|&ty| (ty, Vec::new()))
            .collect();
        Self {
            registry,
            entities,
            components,
            checks,
        }
    }

    pub fn registry(&self) -> &Arc<TrackerRegistry> {
        &self.registry
    }

    pub fn contract_checks(&self) -> bool {
        self.checks
    }

    pub(crate) fn entity_added(&mut self, id: EntityId, kind: TypeId) {
        for bucket in self.registry.entity_routes(kind) {
            if let Some(list) = self.entities.get_mut(bucket) {
                list.push(id);
            }
        }
    }

    pub(crate) fn entity_removed(&mut self, id: EntityId, kind: TypeId) {
        for bucket in self.registry.entity_routes(kind) {
            if let Some(list) = self.entities.get_mut(bucket) {
                list.retain(|&other| other != id);
            }
        }
    }

    pub(crate) fn component_added(&mut self, handle: ComponentHandle, ty: TypeId) {
        for bucket in self.registry.component_routes(ty) {
            if let Some(list) = self.components.get_mut(bucket) {
                list.push(handle);
            }
        }
    }

    pub(crate) fn component_removed(&mut self, handle: ComponentHandle, ty: TypeId) {
        for bucket in self.registry.component_routes(ty) {
            if let Some(list) = self.components.get_mut(bucket) {
                list.retain(|&other| other != handle);
            }
        }
    }

    fn lookup<'a, H>(
        &self,
        buckets: &'a FxHashMap<TypeId, Vec<H>>,
        ty: TypeId,
        name: &'static str,
    ) -> CoreResult<&'a [H]> {
        match buckets.get(&ty) {
            Some(list) => Ok(list.as_slice()),
            None if self.checks => Err(CoreError::Untracked(name)),
            None => Ok(&[]),
        }
    }

    pub(crate) fn entity_bucket(&self, ty: TypeId, name: &'static str) -> CoreResult<&[EntityId]> {
        self.lookup(&self.entities, ty, name)
    }

    pub(crate) fn component_bucket(
        &self,
        ty: TypeId,
        name: &'static str,
    ) -> CoreResult<&[ComponentHandle]> {
        self.lookup(&self.components, ty, name)
    }

    /// Live bucket for `T`. Do not add or remove entities while walking it;
    /// use [`entities_copy`](Self::entities_copy) for that.
    pub fn entities<T: 'static>(&self) -> CoreResult<&[EntityId]> {
        self.entity_bucket(TypeId::of::<T>(), type_name::<T>())
    }

    /// First live member of `T`'s bucket.
    pub fn entity<T: 'static>(&self) -> CoreResult<Option<EntityId>> {
        Ok(self.entities::<T>()?.first().copied())
    }

    pub fn entities_copy<T: 'static>(&self) -> CoreResult<Vec<EntityId>> {
        Ok(self.entities::<T>()?.to_vec())
    }

    /// Lazy forward-only view of `T`'s bucket.
    pub fn iter_entities<T: 'static>(&self) -> CoreResult<impl Iterator<Item = EntityId> + '_> {
        Ok(self.entities::<T>()?.iter().copied())
    }

    pub fn components<T: 'static>(&self) -> CoreResult<&[ComponentHandle]> {
        self.component_bucket(TypeId::of::<T>(), type_name::<T>())
    }

    pub fn component<T: 'static>(&self) -> CoreResult<Option<ComponentHandle>> {
        Ok(self.components::<T>()?.first().copied())
    }

    pub fn components_copy<T: 'static>(&self) -> CoreResult<Vec<ComponentHandle>> {
        Ok(self.components::<T>()?.to_vec())
    }

    pub fn iter_components<T: 'static>(
        &self,
    ) -> CoreResult<impl Iterator<Item = ComponentHandle> + '_> {
        Ok(self.components::<T>()?.iter().copied())
    }
}
