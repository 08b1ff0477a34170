//! Components: behaviour attached to a single entity.
//!
//! A [`Component`] lives in its entity's
//! [`ComponentList`](componentlist::ComponentList) and receives hooks from
//! the scene cascade:
//!
//! - `added` / `removed` – when the list commits it or detaches it
//! - `entity_added` / `entity_removed` – when the owning entity joins or
//!   leaves a scene
//! - `update` – once per frame while the component is active
//! - `draw` – once per frame while the component is visible
//!
//! During `update` the component is temporarily taken out of its list, so it
//! can freely touch its owner (and its owner's other components) through the
//! [`UpdateContext`].
//!
//! # Related
//!
//! - [`coroutine::Coroutine`] – resumable step-function component
//! - [`statemachine::StateMachine`] – numbered states with callbacks
//! - [`crate::resources::tracker`] – type-indexed component lookups

pub mod componentlist;
pub mod coroutine;
pub mod statemachine;

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::resources::entitylist::EntityId;
use crate::scene::context::{DrawContext, UpdateContext};

/// Downcasting support for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Process-unique handle of an attached component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ComponentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub trait Component: AsAny {
    /// Whether the component receives `update` right after being added.
    fn starts_active(&self) -> bool {
        true
    }

    /// Whether the component receives `draw` right after being added.
    fn starts_visible(&self) -> bool {
        true
    }

    fn added(&mut self, _owner: Option<EntityId>) {}

    fn removed(&mut self, _owner: Option<EntityId>) {}

    fn entity_added(&mut self, _owner: EntityId) {}

    fn entity_removed(&mut self, _owner: EntityId) {}

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn draw(&mut self, _ctx: &mut DrawContext<'_>) {}
}
