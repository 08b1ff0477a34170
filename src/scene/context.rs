//! Contexts handed to component and entity hooks.
//!
//! During the update cascade an entity is taken out of the scene while it
//! runs, so a hook can hold its own entity and the rest of the scene
//! mutably at the same time. [`UpdateContext`] bundles the two together
//! with the frame delta and, for component hooks, the id of the component
//! being run.
//!
//! Drawing only gets the entity and the [`Canvas`]; the scene is never
//! reachable from a draw hook.

use crate::components::ComponentId;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::resources::entitylist::EntityId;
use crate::resources::taglist::Tag;
use crate::scene::Scene;
use crate::systems::collision;
use crate::systems::render::Canvas;

pub struct UpdateContext<'a> {
    /// The entity whose hook is running.
    pub entity: &'a mut Entity,
    /// The scene, minus `entity`.
    pub scene: &'a mut Scene,
    /// Scaled frame delta in seconds. Zero for lifecycle hooks.
    pub delta: f32,
    component: Option<ComponentId>,
}

impl<'a> UpdateContext<'a> {
    pub fn new(
        entity: &'a mut Entity,
        scene: &'a mut Scene,
        delta: f32,
        component: Option<ComponentId>,
    ) -> Self {
        Self {
            entity,
            scene,
            delta,
            component,
        }
    }

    /// Id of the component being run, `None` in entity kind hooks.
    pub fn component_id(&self) -> Option<ComponentId> {
        self.component
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity.id()
    }

    pub fn time_active(&self) -> f32 {
        self.scene.time_active()
    }

    /// Detaches the running component at the end of the current pass.
    pub fn remove_self(&mut self) -> CoreResult<()> {
        match self.component {
            Some(id) => self.entity.remove_component(id),
            None => Ok(()),
        }
    }

    /// Pauses or resumes the running component's updates.
    pub fn set_active(&mut self, active: bool) {
        if let Some(id) = self.component {
            self.entity.components_mut().set_active(id, active);
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if let Some(id) = self.component {
            self.entity.components_mut().set_visible(id, visible);
        }
    }

    /// Queues the owning entity for removal at the next flush.
    pub fn remove_entity(&mut self) {
        if let Some(id) = self.entity.id() {
            self.scene.remove(id);
        }
    }

    // ==================== COLLISION SHORTCUTS ====================

    pub fn collide_check_tag(&self, tag: Tag) -> CoreResult<bool> {
        collision::any(&*self.entity, self.scene.tagged_entities(tag))
    }

    pub fn collide_first_tag(&self, tag: Tag) -> CoreResult<Option<EntityId>> {
        Ok(collision::first(&*self.entity, self.scene.tagged_entities(tag))?.and_then(Entity::id))
    }

    pub fn collide_all_tag(&self, tag: Tag) -> CoreResult<Vec<EntityId>> {
        Ok(collision::all(&*self.entity, self.scene.tagged_entities(tag))?
            .into_iter()
            .filter_map(Entity::id)
            .collect())
    }

    pub fn collide_check_kind<K: 'static>(&self) -> CoreResult<bool> {
        collision::any(&*self.entity, self.scene.tracked::<K>()?)
    }

    pub fn collide_first_kind<K: 'static>(&self) -> CoreResult<Option<EntityId>> {
        Ok(collision::first(&*self.entity, self.scene.tracked::<K>()?)?.and_then(Entity::id))
    }
}

impl std::fmt::Debug for UpdateContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("entity", &self.entity.id())
            .field("delta", &self.delta)
            .field("component", &self.component)
            .finish()
    }
}

pub struct DrawContext<'a> {
    pub entity: &'a mut Entity,
    pub canvas: &'a mut dyn Canvas,
    component: Option<ComponentId>,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        entity: &'a mut Entity,
        canvas: &'a mut dyn Canvas,
        component: Option<ComponentId>,
    ) -> Self {
        Self {
            entity,
            canvas,
            component,
        }
    }

    pub fn component_id(&self) -> Option<ComponentId> {
        self.component
    }

    /// Structural changes are refused while drawing.
    pub fn remove_self(&mut self) -> CoreResult<()> {
        match self.component {
            Some(id) => self.entity.remove_component(id),
            None => Err(CoreError::ListLocked),
        }
    }
}
