//! Resumable step-function component.
//!
//! A [`Coroutine`] runs a stack of [`Routine`]s, resuming the top one once
//! per frame. Each resumption returns a [`Step`] saying what happens next:
//!
//! - `Yield` – resume again next frame
//! - `Wait(seconds)` – sleep, then resume on the frame after the wait runs out
//! - `Push(routine)` – run a nested routine to completion first
//! - `Done` – this routine is finished; its parent resumes next frame
//!
//! When the last routine is done the coroutine is finished, and it removes
//! itself from its entity unless `remove_on_complete` is off.
//!
//! # Example
//!
//! ```ignore
//! let mut blinks = 0;
//! entity.add_component(Coroutine::from_fn(move |ctx| {
//!     ctx.entity.visible = !ctx.entity.visible;
//!     blinks += 1;
//!     if blinks < 6 { Step::Wait(0.1) } else { Step::Done }
//! }))?;
//! ```

use log::{trace, warn};

use crate::components::Component;
use crate::scene::context::UpdateContext;

pub enum Step {
    Yield,
    Wait(f32),
    Push(Box<dyn Routine>),
    Done,
}

impl Step {
    pub fn push(routine: impl Routine) -> Self {
        Step::Push(Box::new(routine))
    }

    pub fn push_fn(f: impl FnMut(&mut UpdateContext<'_>) -> Step + 'static) -> Self {
        Step::Push(Box::new(FnRoutine(f)))
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Yield => f.write_str("Yield"),
            Step::Wait(seconds) => f.debug_tuple("Wait").field(seconds).finish(),
            Step::Push(_) => f.write_str("Push(..)"),
            Step::Done => f.write_str("Done"),
        }
    }
}

/// One resumable task. Keeps its own progress between resumptions.
pub trait Routine: 'static {
    fn resume(&mut self, ctx: &mut UpdateContext<'_>) -> Step;
}

/// Boxes a closure as a [`Routine`], e.g. for state machine factories.
pub fn routine_fn(f: impl FnMut(&mut UpdateContext<'_>) -> Step + 'static) -> Box<dyn Routine> {
    Box::new(FnRoutine(f))
}

struct FnRoutine<F>(F);

impl<F> Routine for FnRoutine<F>
where
    F: FnMut(&mut UpdateContext<'_>) -> Step + 'static,
{
    fn resume(&mut self, ctx: &mut UpdateContext<'_>) -> Step {
        (self.0)(ctx)
    }
}

pub struct Coroutine {
    stack: Vec<Box<dyn Routine>>,
    wait_timer: f32,
    finished: bool,
    /// Detach from the entity once finished. On by default.
    pub remove_on_complete: bool,
}

impl std::fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coroutine")
            .field("depth", &self.stack.len())
            .field("wait_timer", &self.wait_timer)
            .field("finished", &self.finished)
            .field("remove_on_complete", &self.remove_on_complete)
            .finish()
    }
}

impl Default for Coroutine {
    fn default() -> Self {
        Self::idle()
    }
}

impl Coroutine {
    pub fn new(routine: impl Routine) -> Self {
        Self {
            stack: vec![Box::new(routine)],
            wait_timer: 0.0,
            finished: false,
            remove_on_complete: true,
        }
    }

    pub fn from_fn(f: impl FnMut(&mut UpdateContext<'_>) -> Step + 'static) -> Self {
        Self::new(FnRoutine(f))
    }

    /// A coroutine with nothing to run, waiting for [`replace`](Self::replace).
    pub fn idle() -> Self {
        Self {
            stack: Vec::new(),
            wait_timer: 0.0,
            finished: true,
            remove_on_complete: true,
        }
    }

    pub fn with_remove_on_complete(mut self, remove: bool) -> Self {
        self.remove_on_complete = remove;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Routines currently stacked, the running one included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn wait_timer(&self) -> f32 {
        self.wait_timer
    }

    /// Stops at once and discards every pending step.
    pub fn cancel(&mut self) {
        self.finished = true;
        self.wait_timer = 0.0;
        self.stack.clear();
    }

    /// Discards everything pending and starts `routine` from scratch on the
    /// next resumption.
    pub fn replace(&mut self, routine: impl Routine) {
        self.replace_boxed(Box::new(routine));
    }

    pub fn replace_fn(&mut self, f: impl FnMut(&mut UpdateContext<'_>) -> Step + 'static) {
        self.replace(FnRoutine(f));
    }

    pub fn replace_boxed(&mut self, routine: Box<dyn Routine>) {
        self.stack.clear();
        self.stack.push(routine);
        self.wait_timer = 0.0;
        self.finished = false;
    }

    /// Advances one frame. Returns `true` on the frame the coroutine
    /// finishes.
    pub fn tick(&mut self, ctx: &mut UpdateContext<'_>) -> bool {
        if self.finished {
            return false;
        }
        if self.wait_timer > 0.0 {
            self.wait_timer -= ctx.delta;
            return false;
        }
        let Some(top) = self.stack.last_mut() else {
            self.finished = true;
            return true;
        };
        match top.resume(ctx) {
            Step::Yield => {}
            Step::Wait(seconds) => self.wait_timer = seconds,
            Step::Push(routine) => self.stack.push(routine),
            Step::Done => {
                self.stack.pop();
                if self.stack.is_empty() {
                    self.finished = true;
                    trace!("coroutine finished");
                    return true;
                }
            }
        }
        false
    }
}

impl Component for Coroutine {
    fn starts_visible(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.tick(ctx) && self.remove_on_complete {
            if let Err(err) = ctx.remove_self() {
                warn!("finished coroutine could not detach: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::*;
    use crate::entity::Entity;
    use crate::math::Vec2;
    use crate::resources::gameconfig::SceneConfig;
    use crate::resources::tracker::TrackerRegistry;
    use crate::scene::Scene;

    fn scene() -> Scene {
        Scene::with_registry(Arc::new(TrackerRegistry::default()), SceneConfig::default())
    }

    fn ticks(coroutine: &mut Coroutine, scene: &mut Scene, delta: f32, frames: usize) -> Vec<bool> {
        let mut entity = Entity::new(Vec2::ZERO);
        (0..frames)
            .map(|_| coroutine.tick(&mut UpdateContext::new(&mut entity, scene, delta, None)))
            .collect()
    }

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) + Clone) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let writer = {
            let log = Rc::clone(&log);
            move |line: &'static str| log.borrow_mut().push(line)
        };
        (log, writer)
    }

    #[test]
    fn test_yield_resumes_every_frame() {
        let mut scene = scene();
        let mut count = 0;
        let mut co = Coroutine::from_fn(move |_| {
            count += 1;
            if count < 3 { Step::Yield } else { Step::Done }
        });
        assert_eq!(ticks(&mut co, &mut scene, 0.1, 4), vec![false, false, true, false]);
        assert!(co.is_finished());
    }

    #[test]
    fn test_wait_sleeps_then_resumes() {
        let mut scene = scene();
        let (log, write) = recorder();
        let mut stage = 0;
        let mut co = Coroutine::from_fn(move |_| {
            stage += 1;
            match stage {
                1 => {
                    write("start");
                    Step::Wait(0.25)
                }
                _ => {
                    write("end");
                    Step::Done
                }
            }
        });
        // Frame 1 resumes, frames 2-4 burn the 0.25s wait, frame 5 resumes.
        let done = ticks(&mut co, &mut scene, 0.1, 5);
        assert_eq!(done, vec![false, false, false, false, true]);
        assert_eq!(*log.borrow(), vec!["start", "end"]);
    }

    #[test]
    fn test_push_runs_nested_routine_first() {
        let mut scene = scene();
        let (log, write) = recorder();
        let mut stage = 0;
        let mut co = Coroutine::from_fn(move |_| {
            stage += 1;
            if stage == 1 {
                let write = write.clone();
                write("outer");
                Step::push_fn(move |_| {
                    write("inner");
                    Step::Done
                })
            } else {
                write("outer again");
                Step::Done
            }
        });
        ticks(&mut co, &mut scene, 0.1, 2);
        assert_eq!(co.depth(), 1);
        ticks(&mut co, &mut scene, 0.1, 2);
        assert!(co.is_finished());
        assert_eq!(*log.borrow(), vec!["outer", "inner", "outer again"]);
    }

    #[test]
    fn test_cancel_and_replace() {
        let mut scene = scene();
        let mut co = Coroutine::from_fn(|_| Step::Wait(10.0));
        ticks(&mut co, &mut scene, 0.1, 1);
        assert!(co.wait_timer() > 0.0);

        co.cancel();
        assert!(co.is_finished());
        assert_eq!(co.depth(), 0);
        assert_eq!(ticks(&mut co, &mut scene, 0.1, 2), vec![false, false]);

        co.replace_fn(|_| Step::Done);
        assert!(!co.is_finished());
        assert_eq!(co.wait_timer(), 0.0);
        assert_eq!(ticks(&mut co, &mut scene, 0.1, 1), vec![true]);
    }

    #[test]
    fn test_idle_does_nothing() {
        let mut scene = scene();
        let mut co = Coroutine::idle();
        assert_eq!(ticks(&mut co, &mut scene, 0.1, 3), vec![false, false, false]);
    }

    #[test]
    fn test_finished_coroutine_detaches_from_entity() {
        let mut scene = scene();
        let mut entity = Entity::new(Vec2::ZERO);
        entity
            .add_component(Coroutine::from_fn(|_| Step::Done))
            .unwrap();
        entity
            .add_component(Coroutine::from_fn(|_| Step::Done).with_remove_on_complete(false))
            .unwrap();
        let id = scene.add(entity);
        scene.update(0.1).unwrap();
        let components = scene.entity(id).unwrap().components();
        assert_eq!(components.len(), 1);
        assert!(components.component::<Coroutine>().unwrap().is_finished());
    }
}
