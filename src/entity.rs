//! Entities: positioned objects that own components, an optional collider
//! and a set of tags.
//!
//! An [`Entity`] is built standalone and becomes live once a
//! [`Scene`](crate::scene::Scene) flushes it in. Gameplay identity comes
//! from its [`EntityKind`], a user type that can also react to lifecycle
//! hooks; the tracker indexes entities by their kind's type.
//!
//! While live, changes that affect scene-wide indexes (tags, depth) are
//! recorded on the entity and applied by the scene at its next sync point:
//! after the entity's own update, when an
//! [`EntityMut`](crate::scene::EntityMut) guard drops, or at the next flush.
//!
//! # Example
//!
//! ```ignore
//! struct Player { lives: u32 }
//! impl EntityKind for Player {}
//!
//! let mut player = Entity::with_kind(Vec2::new(32.0, 32.0), Player { lives: 3 });
//! player.set_collider(Hitbox::new(12.0, 16.0));
//! player.tag(PLAYER_TAG);
//! player.add_component(Coroutine::new(blink))?;
//! let id = scene.add(player);
//! ```

use std::any::{TypeId, type_name};
use std::fmt;

use smallvec::SmallVec;

use crate::colliders::Collider;
use crate::components::componentlist::ComponentList;
use crate::components::{AsAny, Component, ComponentId};
use crate::error::CoreResult;
use crate::math::{Rect, Vec2};
use crate::resources::deferred::LockMode;
use crate::resources::entitylist::EntityId;
use crate::resources::taglist::Tag;
use crate::scene::Scene;
use crate::scene::context::{DrawContext, UpdateContext};
use crate::systems::collision;
use crate::systems::render::Canvas;

/// Gameplay identity of an entity, with optional lifecycle hooks.
///
/// `added` and `removed` run when the scene commits or retires the entity.
/// `update` runs after the entity's components have updated.
pub trait EntityKind: AsAny {
    fn added(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn removed(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn draw(&mut self, _ctx: &mut DrawContext<'_>) {}
}

/// Kind of entities built with [`Entity::new`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Plain;

impl EntityKind for Plain {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexChange {
    Tagged(Tag),
    Untagged(Tag),
    Depth,
}

pub struct Entity {
    pub position: Vec2,
    /// Receives updates.
    pub active: bool,
    /// Receives draws.
    pub visible: bool,
    /// Can be hit by other entities' collision checks.
    pub collidable: bool,
    id: Option<EntityId>,
    live: bool,
    collider: Option<Collider>,
    tags: SmallVec<[Tag; 4]>,
    depth: i32,
    actual_depth: f64,
    components: ComponentList,
    kind: Option<Box<dyn EntityKind>>,
    kind_type: TypeId,
    kind_name: &'static str,
    outbox: Vec<IndexChange>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kind", &self.kind_name)
            .field("position", &self.position)
            .field("depth", &self.depth)
            .field("tags", &self.tags)
            .field("collider", &self.collider)
            .field("components", &self.components)
            .finish()
    }
}

impl Entity {
    pub fn new(position: Vec2) -> Self {
        Self::with_kind(position, Plain)
    }

    pub fn with_kind<K: EntityKind>(position: Vec2, kind: K) -> Self {
        Self {
            position,
            active: true,
            visible: true,
            collidable: true,
            id: None,
            live: false,
            collider: None,
            tags: SmallVec::new(),
            depth: 0,
            actual_depth: 0.0,
            components: ComponentList::new(),
            kind: Some(Box::new(kind)),
            kind_type: TypeId::of::<K>(),
            kind_name: type_name::<K>(),
            outbox: Vec::new(),
        }
    }

    /// Handle in the scene this entity was added to.
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: Option<EntityId>) {
        self.id = id;
    }

    /// Whether the entity has been committed to a scene.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub(crate) fn set_live(&mut self, live: bool) {
        self.live = live;
        self.outbox.clear();
    }

    // ==================== KIND ====================

    pub fn kind_type(&self) -> TypeId {
        self.kind_type
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }

    pub fn is<K: EntityKind>(&self) -> bool {
        self.kind_type == TypeId::of::<K>()
    }

    /// The entity's kind as `K`. `None` for another kind, or while the kind
    /// is running one of its own hooks.
    pub fn kind<K: EntityKind>(&self) -> Option<&K> {
        self.kind
            .as_deref()
            .and_then(|k| k.as_any().downcast_ref::<K>())
    }

    pub fn kind_mut<K: EntityKind>(&mut self) -> Option<&mut K> {
        self.kind
            .as_deref_mut()
            .and_then(|k| k.as_any_mut().downcast_mut::<K>())
    }

    /// Runs `hook` with the kind taken out, so the hook can borrow the
    /// entity mutably alongside it.
    pub(crate) fn with_kind_taken(&mut self, hook: impl FnOnce(&mut dyn EntityKind, &mut Entity)) {
        if let Some(mut kind) = self.kind.take() {
            hook(kind.as_mut(), self);
            self.kind = Some(kind);
        }
    }

    // ==================== POSITION AND BOUNDS ====================

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.position.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.position.y = y;
    }

    pub fn width(&self) -> f32 {
        self.collider.as_ref().map_or(0.0, Collider::width)
    }

    pub fn height(&self) -> f32 {
        self.collider.as_ref().map_or(0.0, Collider::height)
    }

    /// World-space left edge of the collider, or the position without one.
    pub fn left(&self) -> f32 {
        self.position.x + self.collider.as_ref().map_or(0.0, Collider::left)
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.collider.as_ref().map_or(0.0, Collider::right)
    }

    pub fn top(&self) -> f32 {
        self.position.y + self.collider.as_ref().map_or(0.0, Collider::top)
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.collider.as_ref().map_or(0.0, Collider::bottom)
    }

    pub fn centre_x(&self) -> f32 {
        self.position.x + self.collider.as_ref().map_or(0.0, Collider::centre_x)
    }

    pub fn centre_y(&self) -> f32 {
        self.position.y + self.collider.as_ref().map_or(0.0, Collider::centre_y)
    }

    pub fn set_left(&mut self, value: f32) {
        self.position.x = value - self.collider.as_ref().map_or(0.0, Collider::left);
    }

    pub fn set_right(&mut self, value: f32) {
        self.position.x = value - self.collider.as_ref().map_or(0.0, Collider::right);
    }

    pub fn set_top(&mut self, value: f32) {
        self.position.y = value - self.collider.as_ref().map_or(0.0, Collider::top);
    }

    pub fn set_bottom(&mut self, value: f32) {
        self.position.y = value - self.collider.as_ref().map_or(0.0, Collider::bottom);
    }

    pub fn set_centre_x(&mut self, value: f32) {
        self.position.x = value - self.collider.as_ref().map_or(0.0, Collider::centre_x);
    }

    pub fn set_centre_y(&mut self, value: f32) {
        self.position.y = value - self.collider.as_ref().map_or(0.0, Collider::centre_y);
    }

    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.left(), self.top())
    }

    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    pub fn centre(&self) -> Vec2 {
        Vec2::new(self.centre_x(), self.centre_y())
    }

    pub fn set_centre(&mut self, centre: Vec2) {
        self.set_centre_x(centre.x);
        self.set_centre_y(centre.y);
    }

    /// World-space bounding box of the collider (empty at the position
    /// without one).
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left(), self.top(), self.width(), self.height())
    }

    // ==================== COLLIDER ====================

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn collider_mut(&mut self) -> Option<&mut Collider> {
        self.collider.as_mut()
    }

    /// Installs a collider, returning the previous one. The entity owns the
    /// collider outright, so it can never be shared with another entity.
    pub fn set_collider(&mut self, collider: impl Into<Collider>) -> Option<Collider> {
        self.collider.replace(collider.into())
    }

    pub fn take_collider(&mut self) -> Option<Collider> {
        self.collider.take()
    }

    // ==================== TAGS AND DEPTH ====================

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tag(&mut self, tag: Tag) {
        if !self.has_tag(tag) {
            self.tags.push(tag);
            if self.live {
                self.outbox.push(IndexChange::Tagged(tag));
            }
        }
    }

    pub fn untag(&mut self, tag: Tag) {
        if let Some(index) = self.tags.iter().position(|&t| t == tag) {
            self.tags.remove(index);
            if self.live {
                self.outbox.push(IndexChange::Untagged(tag));
            }
        }
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Changes the declared depth. A live entity moves behind every other
    /// entity already at the new depth.
    pub fn set_depth(&mut self, depth: i32) {
        if self.depth != depth {
            self.depth = depth;
            if self.live {
                self.outbox.push(IndexChange::Depth);
            }
        }
    }

    /// Depth plus the tie-breaking offset assigned by the scene.
    pub fn actual_depth(&self) -> f64 {
        self.actual_depth
    }

    pub(crate) fn set_actual_depth(&mut self, actual_depth: f64) {
        self.actual_depth = actual_depth;
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<IndexChange> {
        std::mem::take(&mut self.outbox)
    }

    // ==================== COMPONENTS ====================

    pub fn components(&self) -> &ComponentList {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentList {
        &mut self.components
    }

    pub fn add_component(&mut self, component: impl Component) -> CoreResult<ComponentId> {
        self.components.add(component)
    }

    pub fn remove_component(&mut self, id: ComponentId) -> CoreResult<()> {
        self.components.remove(id)
    }

    pub fn component<T: Component>(&self) -> Option<&T> {
        self.components.component::<T>()
    }

    pub fn component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.component_mut::<T>()
    }

    // ==================== CASCADE ====================

    /// Updates active components with the list locked, then the kind.
    pub(crate) fn update(&mut self, scene: &mut Scene, delta: f32) {
        self.components.set_lock_mode(LockMode::Locked);
        for index in 0..self.components.len() {
            let Some((id, mut component)) = self.components.take_at(index, |active, _| active)
            else {
                continue;
            };
            component.update(&mut UpdateContext::new(self, scene, delta, Some(id)));
            self.components.restore_at(index, component);
        }
        self.components.set_lock_mode(LockMode::Open);

        self.with_kind_taken(|kind, entity| {
            kind.update(&mut UpdateContext::new(entity, scene, delta, None));
        });
    }

    /// Draws visible components, then the kind. The component list refuses
    /// changes until both are done.
    pub(crate) fn draw(&mut self, canvas: &mut dyn Canvas) {
        self.components.set_lock_mode(LockMode::Error);
        for index in 0..self.components.len() {
            let Some((id, mut component)) = self.components.take_at(index, |_, visible| visible)
            else {
                continue;
            };
            component.draw(&mut DrawContext::new(self, canvas, Some(id)));
            self.components.restore_at(index, component);
        }
        self.with_kind_taken(|kind, entity| {
            kind.draw(&mut DrawContext::new(entity, canvas, None));
        });
        self.components.set_lock_mode(LockMode::Open);
    }

    // ==================== COLLISION ====================

    /// Whether this entity's collider overlaps `other`'s. See
    /// [`collision::check`] for the guards.
    pub fn collide_check(&self, other: &Entity) -> CoreResult<bool> {
        collision::check(self, other)
    }

    /// Same as [`collide_check`](Self::collide_check) with this entity
    /// probed at `at`.
    pub fn collide_check_at(&self, other: &Entity, at: Vec2) -> CoreResult<bool> {
        collision::check_at(self, other, at)
    }

    /// Not colliding with `other` now, but colliding when probed at `at`.
    pub fn collide_check_outside(&self, other: &Entity, at: Vec2) -> CoreResult<bool> {
        collision::check_outside(self, other, at)
    }

    pub fn collide_point(&self, point: Vec2) -> bool {
        collision::check_point(self, point)
    }

    pub fn collide_point_at(&self, point: Vec2, at: Vec2) -> bool {
        collision::check_point_at(self, point, at)
    }

    pub fn collide_line(&self, from: Vec2, to: Vec2) -> bool {
        collision::check_line(self, from, to)
    }

    pub fn collide_line_at(&self, from: Vec2, to: Vec2, at: Vec2) -> bool {
        collision::check_line_at(self, from, to, at)
    }

    pub fn collide_rect(&self, rect: &Rect) -> bool {
        collision::check_rect(self, rect)
    }

    pub fn collide_rect_at(&self, rect: &Rect, at: Vec2) -> bool {
        collision::check_rect_at(self, rect, at)
    }

    /// The entity among `others` whose position is nearest to this one's.
    pub fn closest<'e>(&self, others: impl IntoIterator<Item = &'e Entity>) -> Option<&'e Entity> {
        collision::closest(self, others)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::Hitbox;

    struct Crate {
        weight: u32,
    }

    impl EntityKind for Crate {}

    #[test]
    fn test_bounds_without_collider_collapse_to_position() {
        let e = Entity::new(Vec2::new(3.0, 4.0));
        assert_eq!(e.left(), 3.0);
        assert_eq!(e.right(), 3.0);
        assert_eq!(e.bottom(), 4.0);
        assert_eq!(e.width(), 0.0);
    }

    #[test]
    fn test_bounds_follow_collider() {
        let mut e = Entity::new(Vec2::new(10.0, 10.0));
        e.set_collider(Hitbox::new(4.0, 6.0).with_offset(Vec2::new(-2.0, -6.0)));
        assert_eq!(e.bounds(), Rect::new(8.0, 4.0, 4.0, 6.0));
        assert_eq!(e.centre(), Vec2::new(10.0, 7.0));

        e.set_bottom(100.0);
        assert_eq!(e.position.y, 100.0);
        e.set_left(0.0);
        assert_eq!(e.position.x, 2.0);
        e.set_centre(Vec2::ZERO);
        assert_eq!(e.position, Vec2::new(0.0, 3.0));
    }

    #[test]
    fn test_set_collider_returns_previous() {
        let mut e = Entity::new(Vec2::ZERO);
        assert!(e.set_collider(Hitbox::new(1.0, 1.0)).is_none());
        let old = e.set_collider(Hitbox::new(2.0, 2.0));
        assert_eq!(old, Some(Collider::Hitbox(Hitbox::new(1.0, 1.0))));
        assert_eq!(e.width(), 2.0);
    }

    #[test]
    fn test_tag_and_untag() {
        let mut e = Entity::new(Vec2::ZERO);
        e.tag(2);
        e.tag(2);
        e.tag(5);
        assert_eq!(e.tags(), &[2, 5]);
        e.untag(2);
        assert_eq!(e.tags(), &[5]);
        assert!(!e.has_tag(2));
    }

    #[test]
    fn test_standalone_changes_are_not_recorded() {
        let mut e = Entity::new(Vec2::ZERO);
        e.tag(1);
        e.set_depth(4);
        assert!(e.take_outbox().is_empty());

        e.set_live(true);
        e.tag(3);
        e.untag(1);
        e.set_depth(4);
        e.set_depth(2);
        assert_eq!(
            e.take_outbox(),
            vec![
                IndexChange::Tagged(3),
                IndexChange::Untagged(1),
                IndexChange::Depth
            ]
        );
    }

    #[test]
    fn test_kind_downcast() {
        let mut e = Entity::with_kind(Vec2::ZERO, Crate { weight: 3 });
        assert!(e.is::<Crate>());
        assert!(!e.is::<Plain>());
        assert_eq!(e.kind::<Crate>().map(|c| c.weight), Some(3));
        e.kind_mut::<Crate>().unwrap().weight = 8;
        assert_eq!(e.kind::<Crate>().unwrap().weight, 8);
        assert!(e.kind::<Plain>().is_none());
        assert!(e.kind_name().ends_with("Crate"));
    }

    #[test]
    fn test_collide_check_outside() {
        let mut a = Entity::new(Vec2::ZERO);
        a.set_collider(Hitbox::new(4.0, 4.0));
        let mut b = Entity::new(Vec2::new(10.0, 0.0));
        b.set_collider(Hitbox::new(4.0, 4.0));

        assert!(a.collide_check_outside(&b, Vec2::new(8.0, 0.0)).unwrap());
        assert!(!a.collide_check_outside(&b, Vec2::new(0.0, 20.0)).unwrap());
        a.position = Vec2::new(9.0, 0.0);
        assert!(!a.collide_check_outside(&b, Vec2::new(8.0, 0.0)).unwrap());
    }
}
