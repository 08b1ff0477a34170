//! Deferred structural changes for lists that are iterated while gameplay
//! code runs.
//!
//! Both the per-entity [`ComponentList`](crate::components::componentlist::ComponentList)
//! and the per-scene [`EntityList`](crate::resources::entitylist::EntityList)
//! route their adds and removes through a [`ChangeQueue`]. The queue's
//! [`LockMode`] decides what happens to a request:
//!
//! - **Open** – the change applies immediately.
//! - **Locked** – the change is queued and applied at the next flush.
//! - **Error** – the change is refused with [`CoreError::ListLocked`].
//!
//! A flush hands the queued changes to a [`FlushTarget`], always all
//! additions first and then all removals.

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    #[default]
    Open,
    Locked,
    Error,
}

/// Items that can be matched against a removal request.
pub trait Keyed {
    type Key: Copy + PartialEq;

    fn key(&self) -> Self::Key;
}

/// What the owning list should do with an add request.
#[derive(Debug)]
pub enum AddOutcome<T> {
    /// Commit the item now.
    Apply(T),
    Queued,
    /// Already committed or already queued.
    Ignored,
}

/// What the owning list should do with a remove request.
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveOutcome<T> {
    /// Detach the committed item now.
    Apply,
    Queued,
    /// The item was still waiting to be added; it never becomes live.
    Cancelled(T),
    /// Not committed and not pending.
    Ignored,
}

/// Receives a flush.
pub trait FlushTarget<T: Keyed> {
    fn commit_add(&mut self, item: T);
    fn commit_remove(&mut self, key: T::Key);
}

/// Changes drained from a queue, applied in the fixed order.
#[derive(Debug)]
pub struct Flush<T: Keyed> {
    adds: Vec<T>,
    removes: Vec<T::Key>,
}

impl<T: Keyed> Flush<T> {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.adds.len(), self.removes.len())
    }

    /// Commits all additions, then all removals.
    pub fn apply_to(self, target: &mut impl FlushTarget<T>) {
        for item in self.adds {
            target.commit_add(item);
        }
        for key in self.removes {
            target.commit_remove(key);
        }
    }
}

#[derive(Debug)]
pub struct ChangeQueue<T: Keyed> {
    mode: LockMode,
    to_add: Vec<T>,
    to_remove: Vec<T::Key>,
}

impl<T: Keyed> ChangeQueue<T> {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode,
            to_add: Vec::new(),
            to_remove: Vec::new(),
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn is_pending_add(&self, key: T::Key) -> bool {
        self.to_add.iter().any(|item| item.key() == key)
    }

    pub fn is_pending_remove(&self, key: T::Key) -> bool {
        self.to_remove.contains(&key)
    }

    /// Routes an add request. `committed` tells whether the item is already
    /// live in the owning list.
    pub fn request_add(&mut self, item: T, committed: bool) -> CoreResult<AddOutcome<T>> {
        match self.mode {
            LockMode::Error => Err(CoreError::ListLocked),
            _ if committed || self.is_pending_add(item.key()) => Ok(AddOutcome::Ignored),
            LockMode::Open => Ok(AddOutcome::Apply(item)),
            LockMode::Locked => {
                self.to_add.push(item);
                Ok(AddOutcome::Queued)
            }
        }
    }

    /// Routes a remove request. Removing an item that is still queued for
    /// addition cancels the addition instead.
    pub fn request_remove(&mut self, key: T::Key, committed: bool) -> CoreResult<RemoveOutcome<T>> {
        if self.mode == LockMode::Error {
            return Err(CoreError::ListLocked);
        }
        if let Some(index) = self.to_add.iter().position(|item| item.key() == key) {
            return Ok(RemoveOutcome::Cancelled(self.to_add.remove(index)));
        }
        if !committed {
            return Ok(RemoveOutcome::Ignored);
        }
        match self.mode {
            LockMode::Open => Ok(RemoveOutcome::Apply),
            _ if self.to_remove.contains(&key) => Ok(RemoveOutcome::Ignored),
            _ => {
                self.to_remove.push(key);
                Ok(RemoveOutcome::Queued)
            }
        }
    }

    /// Switches mode and drains everything queued so far.
    pub fn set_mode(&mut self, mode: LockMode) -> Flush<T> {
        self.mode = mode;
        self.drain()
    }

    /// Drains the queues without changing mode.
    pub fn drain(&mut self) -> Flush<T> {
        Flush {
            adds: std::mem::take(&mut self.to_add),
            removes: std::mem::take(&mut self.to_remove),
        }
    }
}
