//! Tag index: for every tag, the live entities carrying it, in depth order.
//!
//! Tags are small non-negative integers used as dense indices, so the index
//! is a vector of buckets that grows on demand. Buckets are re-sorted lazily
//! at the top of the scene update, and only when something marked them.

use crate::resources::entitylist::EntityId;

/// Small integer category label.
pub type Tag = usize;

#[derive(Debug, Default, Clone)]
pub struct TagLists {
    lists: Vec<Vec<EntityId>>,
    unsorted: Vec<bool>,
    any_unsorted: bool,
}

impl TagLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entities tagged `tag`. Unknown tags are simply empty.
    pub fn get(&self, tag: Tag) -> &[EntityId] {
        self.lists.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, tag: Tag) -> usize {
        self.get(tag).len()
    }

    /// Highest tag index with a bucket, plus one.
    pub fn capacity(&self) -> usize {
        self.lists.len()
    }

    fn bucket(&mut self, tag: Tag) -> &mut Vec<EntityId> {
        if tag >= self.lists.len() {
            self.lists.resize_with(tag + 1, Vec::new);
            self.unsorted.resize(tag + 1, false);
        }
        &mut self.lists[tag]
    }

    pub(crate) fn add(&mut self, tag: Tag, id: EntityId) {
        let bucket = self.bucket(tag);
        if !bucket.contains(&id) {
            bucket.push(id);
            self.mark_unsorted(tag);
        }
    }

    pub(crate) fn remove(&mut self, tag: Tag, id: EntityId) {
        if let Some(bucket) = self.lists.get_mut(tag) {
            bucket.retain(|&other| other != id);
        }
    }

    pub(crate) fn mark_unsorted(&mut self, tag: Tag) {
        if tag < self.unsorted.len() {
            self.unsorted[tag] = true;
            self.any_unsorted = true;
        }
    }

    /// Sorts every marked bucket by `depth`. Returns how many were sorted.
    pub(crate) fn sort_marked(&mut self, depth: impl Fn(EntityId) -> f64) -> usize {
        if !std::mem::take(&mut self.any_unsorted) {
            return 0;
        }
        let mut sorted = 0;
        for (bucket, unsorted) in self.lists.iter_mut().zip(self.unsorted.iter_mut()) {
            if std::mem::take(unsorted) {
                bucket.sort_by(|a, b| depth(*a).total_cmp(&depth(*b)));
                sorted += 1;
            }
        }
        sorted
    }
}
