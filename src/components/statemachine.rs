//! Numbered-state machine component.
//!
//! Each state can have four callbacks:
//!
//! - `update` – every frame while in the state; returns the next state
//! - `begin` – once when entering the state
//! - `end` – once when leaving the state
//! - `coroutine` – builds a routine that runs while in the state
//!
//! The machine enters state 0 on its first update. A transition runs the old
//! state's `end`, then the new state's `begin`, then swaps the running
//! routine for the new state's (or cancels it when the state has none).
//!
//! # Example
//!
//! ```ignore
//! const IDLE: usize = 0;
//! const CHASE: usize = 1;
//!
//! let machine = StateMachine::new(2)
//!     .on_update(IDLE, |ctx| if player_near(ctx) { CHASE } else { IDLE })
//!     .on_update(CHASE, chase_update)
//!     .on_begin(CHASE, |ctx| ctx.entity.tag(ALERT))
//!     .on_coroutine(CHASE, || Box::new(growl()));
//! entity.add_component(machine)?;
//! ```
//!
//! # Related
//!
//! - [`crate::components::coroutine`] – the routine machinery reused here

use log::{debug, warn};

use crate::components::Component;
use crate::components::coroutine::{Coroutine, Routine};
use crate::error::{CoreError, CoreResult};
use crate::scene::context::UpdateContext;

pub type UpdateCallback = Box<dyn FnMut(&mut UpdateContext<'_>) -> usize>;
pub type HookCallback = Box<dyn FnMut(&mut UpdateContext<'_>)>;
pub type CoroutineFactory = Box<dyn FnMut() -> Box<dyn Routine>>;

#[derive(Default)]
struct StateCallbacks {
    update: Option<UpdateCallback>,
    begin: Option<HookCallback>,
    end: Option<HookCallback>,
    coroutine: Option<CoroutineFactory>,
}

pub struct StateMachine {
    state: Option<usize>,
    previous: Option<usize>,
    next: Option<usize>,
    changed_states: bool,
    time_in_state: f32,
    /// Log transitions at debug level.
    pub log: bool,
    states: Vec<StateCallbacks>,
    routine: Coroutine,
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.state)
            .field("previous", &self.previous)
            .field("states", &self.states.len())
            .field("time_in_state", &self.time_in_state)
            .finish()
    }
}

impl StateMachine {
    /// A machine with `count` states and no callbacks yet.
    pub fn new(count: usize) -> Self {
        Self {
            state: None,
            previous: None,
            next: None,
            changed_states: false,
            time_in_state: 0.0,
            log: false,
            states: (0..count).map(|_| StateCallbacks::default()).collect(),
            routine: Coroutine::idle().with_remove_on_complete(false),
        }
    }

    fn slot(&mut self, state: usize) -> &mut StateCallbacks {
        if state >= self.states.len() {
            self.states.resize_with(state + 1, StateCallbacks::default);
        }
        &mut self.states[state]
    }

    pub fn on_update(
        mut self,
        state: usize,
        f: impl FnMut(&mut UpdateContext<'_>) -> usize + 'static,
    ) -> Self {
        self.slot(state).update = Some(Box::new(f));
        self
    }

    pub fn on_begin(mut self, state: usize, f: impl FnMut(&mut UpdateContext<'_>) + 'static) -> Self {
        self.slot(state).begin = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, state: usize, f: impl FnMut(&mut UpdateContext<'_>) + 'static) -> Self {
        self.slot(state).end = Some(Box::new(f));
        self
    }

    pub fn on_coroutine(
        mut self,
        state: usize,
        f: impl FnMut() -> Box<dyn Routine> + 'static,
    ) -> Self {
        self.slot(state).coroutine = Some(Box::new(f));
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Current state, `None` before the first update.
    pub fn state(&self) -> Option<usize> {
        self.state
    }

    pub fn previous_state(&self) -> Option<usize> {
        self.previous
    }

    /// Whether the state changed during the last update.
    pub fn changed_states(&self) -> bool {
        self.changed_states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Seconds spent in the current state.
    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    /// Whether the current state's routine has run to completion.
    pub fn routine_finished(&self) -> bool {
        self.routine.is_finished()
    }

    fn check(&self, state: usize) -> CoreResult<()> {
        if state >= self.states.len() {
            return Err(CoreError::StateOutOfRange {
                state,
                count: self.states.len(),
            });
        }
        Ok(())
    }

    /// Moves to `state` now, running the transition callbacks. Staying in
    /// the current state does nothing.
    pub fn set_state(&mut self, state: usize, ctx: &mut UpdateContext<'_>) -> CoreResult<()> {
        self.check(state)?;
        if self.state != Some(state) {
            self.transition(state, ctx);
        }
        Ok(())
    }

    /// Like [`set_state`](Self::set_state), but re-enters the current state
    /// too.
    pub fn force_state(&mut self, state: usize, ctx: &mut UpdateContext<'_>) -> CoreResult<()> {
        self.check(state)?;
        self.transition(state, ctx);
        Ok(())
    }

    /// Requests a move to `state` at the start of the next update, for
    /// callers outside the machine's own update.
    pub fn queue_state(&mut self, state: usize) -> CoreResult<()> {
        self.check(state)?;
        self.next = Some(state);
        Ok(())
    }

    fn transition(&mut self, state: usize, ctx: &mut UpdateContext<'_>) {
        if self.log {
            debug!("enter state {state} (leaving {:?})", self.state);
        }
        self.changed_states = true;

        if let Some(old) = self.state {
            if let Some(end) = self.states[old].end.as_mut() {
                end(ctx);
            }
        }
        self.previous = self.state;
        self.state = Some(state);
        self.time_in_state = 0.0;

        let callbacks = &mut self.states[state];
        if let Some(begin) = callbacks.begin.as_mut() {
            begin(ctx);
        }
        match callbacks.coroutine.as_mut() {
            Some(factory) => {
                if self.log {
                    debug!("starting coroutine {state}");
                }
                self.routine.replace_boxed(factory());
            }
            None => self.routine.cancel(),
        }
    }

    /// Debug-logs which callbacks each state has, as `U`, `B`, `E`, `C`.
    pub fn log_states(&self) {
        for (index, callbacks) in self.states.iter().enumerate() {
            debug!(
                "state {index}: {}{}{}{}",
                if callbacks.update.is_some() { "U" } else { "" },
                if callbacks.begin.is_some() { "B" } else { "" },
                if callbacks.end.is_some() { "E" } else { "" },
                if callbacks.coroutine.is_some() { "C" } else { "" },
            );
        }
    }
}

impl Component for StateMachine {
    fn starts_visible(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.changed_states = false;

        let entering = match self.next.take() {
            Some(next) => Some(next),
            None if self.state.is_none() => Some(0),
            None => None,
        };
        if let Some(state) = entering {
            if let Err(err) = self.set_state(state, ctx) {
                warn!("state machine cannot start: {err}");
                return;
            }
        } else {
            self.time_in_state += ctx.delta;
        }

        let Some(current) = self.state else {
            return;
        };
        if let Some(update) = self.states[current].update.as_mut() {
            let next = update(ctx);
            if let Err(err) = self.set_state(next, ctx) {
                warn!("state {current} asked for a missing state: {err}");
            }
        }

        if !self.routine.is_finished() && self.routine.tick(ctx) && self.log {
            debug!("coroutine {:?} finished", self.state);
        }
    }
}
