//! Scene tick integration tests: the deferred component and entity lists,
//! depth ordering and the draw lock, driven through full scene frames.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use cinder2d::components::Component;
use cinder2d::entity::{Entity, EntityKind};
use cinder2d::error::CoreError;
use cinder2d::math::Vec2;
use cinder2d::resources::gameconfig::SceneConfig;
use cinder2d::resources::tracker::TrackerRegistry;
use cinder2d::scene::Scene;
use cinder2d::scene::context::{DrawContext, UpdateContext};
use cinder2d::systems::render::RecordingCanvas;

type Log = Rc<RefCell<Vec<String>>>;

fn scene() -> Scene {
    Scene::with_registry(Arc::new(TrackerRegistry::default()), SceneConfig::default())
}

/// Logs every update and adds a [`Child`] on its first one.
struct Parent {
    log: Log,
    frame: u32,
}

impl Component for Parent {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.frame += 1;
        self.log.borrow_mut().push(format!("parent {}", self.frame));
        if self.frame == 1 {
            let child = Child {
                log: Rc::clone(&self.log),
            };
            ctx.entity.add_component(child).unwrap();
        }
    }
}

struct Child {
    log: Log,
}

impl Component for Child {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {
        self.log.borrow_mut().push("child".to_string());
    }
}

/// Removes itself on its first update.
struct OneShot {
    runs: Rc<RefCell<u32>>,
}

impl Component for OneShot {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        *self.runs.borrow_mut() += 1;
        ctx.remove_self().unwrap();
    }
}

/// Tries to add a component while drawing.
struct GreedyDrawer {
    result: Rc<RefCell<Option<Result<(), CoreError>>>>,
}

impl Component for GreedyDrawer {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let outcome = ctx.entity.add_component(Marker).map(|_| ());
        *self.result.borrow_mut() = Some(outcome);
    }
}

struct Marker;

impl Component for Marker {}

// ==================== COMPONENT LIST TESTS ====================

#[test]
fn test_component_added_during_update_starts_next_frame() {
    let mut scene = scene();
    let log: Log = Rc::default();
    let mut entity = Entity::new(Vec2::ZERO);
    entity
        .add_component(Parent {
            log: Rc::clone(&log),
            frame: 0,
        })
        .unwrap();
    let id = scene.add(entity);

    scene.update(0.1).unwrap();
    assert_eq!(*log.borrow(), vec!["parent 1"]);
    assert_eq!(scene.entity(id).unwrap().components().len(), 2);

    scene.update(0.1).unwrap();
    assert_eq!(*log.borrow(), vec!["parent 1", "parent 2", "child"]);
}

#[test]
fn test_component_removing_itself_is_gone_next_frame() {
    let mut scene = scene();
    let runs = Rc::new(RefCell::new(0));
    let mut entity = Entity::new(Vec2::ZERO);
    entity
        .add_component(OneShot {
            runs: Rc::clone(&runs),
        })
        .unwrap();
    entity.add_component(Marker).unwrap();
    let id = scene.add(entity);

    scene.update(0.1).unwrap();
    scene.update(0.1).unwrap();
    scene.update(0.1).unwrap();
    assert_eq!(*runs.borrow(), 1);
    let components = scene.entity(id).unwrap().components();
    assert_eq!(components.len(), 1);
    assert!(components.component::<OneShot>().is_none());
    assert!(components.component::<Marker>().is_some());
}

#[test]
fn test_adding_components_while_drawing_is_refused() {
    let mut scene = scene();
    let result = Rc::new(RefCell::new(None));
    let mut entity = Entity::new(Vec2::ZERO);
    entity
        .add_component(GreedyDrawer {
            result: Rc::clone(&result),
        })
        .unwrap();
    let id = scene.add(entity);
    scene.update(0.1).unwrap();

    scene.draw(&mut RecordingCanvas::new()).unwrap();
    assert_eq!(*result.borrow(), Some(Err(CoreError::ListLocked)));
    assert_eq!(scene.entity(id).unwrap().components().len(), 1);

    // Structural changes are fine again once drawing is over.
    let mut entity = scene.entity_mut(id).unwrap();
    assert!(entity.add_component(Marker).is_ok());
}

/// A kind that tries to add a component from its own draw hook.
struct GreedyKind {
    result: Rc<RefCell<Option<Result<(), CoreError>>>>,
}

impl EntityKind for GreedyKind {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let outcome = ctx.entity.add_component(Marker).map(|_| ());
        *self.result.borrow_mut() = Some(outcome);
    }
}

#[test]
fn test_kind_draw_cannot_add_components() {
    let mut scene = scene();
    let result = Rc::new(RefCell::new(None));
    let entity = Entity::with_kind(
        Vec2::ZERO,
        GreedyKind {
            result: Rc::clone(&result),
        },
    );
    let id = scene.add(entity);
    scene.update(0.1).unwrap();

    scene.draw(&mut RecordingCanvas::new()).unwrap();
    assert_eq!(*result.borrow(), Some(Err(CoreError::ListLocked)));
    assert!(scene.entity(id).unwrap().components().is_empty());

    let mut entity = scene.entity_mut(id).unwrap();
    assert!(entity.add_component(Marker).is_ok());
}

// ==================== ENTITY LIST TESTS ====================

#[test]
fn test_equal_depths_keep_insertion_order() {
    let mut scene = scene();
    let helper = scene.helper();
    let ids: Vec<_> = [5, 5, 5, 1]
        .into_iter()
        .map(|depth| {
            let mut entity = Entity::new(Vec2::ZERO);
            entity.set_depth(depth);
            scene.add(entity)
        })
        .collect();
    scene.update(0.0).unwrap();

    let order: Vec<_> = scene
        .entities()
        .ids()
        .iter()
        .copied()
        .filter(|&id| id != helper)
        .collect();
    assert_eq!(order, vec![ids[3], ids[0], ids[1], ids[2]]);
}

#[test]
fn test_entity_added_and_removed_before_flush_never_goes_live() {
    let mut scene = scene();
    let id = scene.add(Entity::new(Vec2::ZERO));
    scene.remove(id);
    scene.update(0.1).unwrap();
    assert!(scene.entity(id).is_none());
    assert_eq!(scene.entities().len(), 1);
}

#[test]
fn test_entity_removed_during_update_is_gone_next_frame() {
    struct SelfDestruct;
    impl Component for SelfDestruct {
        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            ctx.remove_entity();
        }
    }

    let mut scene = scene();
    let mut entity = Entity::new(Vec2::ZERO);
    entity.tag(4);
    entity.add_component(SelfDestruct).unwrap();
    let id = scene.add(entity);

    scene.update(0.1).unwrap();
    assert!(scene.entities().contains(id));
    assert_eq!(scene.tagged(4), &[id]);

    scene.update(0.1).unwrap();
    assert!(!scene.entities().contains(id));
    assert!(scene.tagged(4).is_empty());
}

#[test]
fn test_time_scale_applies_to_delta() {
    let mut scene = scene();
    scene.time_mut().time_scale = 0.5;
    scene.update(0.2).unwrap();
    scene.update(0.2).unwrap();
    assert!((scene.time_active() - 0.2).abs() < 1e-6);
    assert_eq!(scene.time().frame_count, 2);
}
