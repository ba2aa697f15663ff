use std::collections::HashMap;

use crate::StripItem;

/// Idle item instances waiting to be reused, grouped by reuse key.
///
/// The pool is unbounded: the number of live instances is bounded by the visible window, so
/// the pool never holds more than a handful of instances per key.
#[derive(Debug)]
pub struct RecyclerPool<I> {
    idle: HashMap<String, Vec<I>>,
}

impl<I> Default for RecyclerPool<I> {
    fn default() -> Self {
        Self {
            idle: HashMap::new(),
        }
    }
}

impl<I: StripItem> RecyclerPool<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns an idle instance pooled under `reuse_key`.
    pub fn dequeue(&mut self, reuse_key: &str) -> Option<I> {
        let item = self.idle.get_mut(reuse_key)?.pop();
        vtrace!(reuse_key, hit = item.is_some(), "RecyclerPool::dequeue");
        item
    }

    /// Pools an instance under its own reuse key.
    pub fn enqueue(&mut self, item: I) {
        match self.idle.get_mut(item.reuse_key()) {
            Some(bucket) => bucket.push(item),
            None => {
                let key = item.reuse_key().to_owned();
                self.idle.insert(key, vec![item]);
            }
        }
    }

    /// Number of idle instances under `reuse_key`.
    pub fn len_for(&self, reuse_key: &str) -> usize {
        self.idle.get(reuse_key).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.idle.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.idle.values().all(Vec::is_empty)
    }

    /// Iterates over every idle instance.
    pub fn iter(&self) -> impl Iterator<Item = &I> {
        self.idle.values().flatten()
    }

    /// Drops every idle instance.
    pub fn clear(&mut self) {
        self.idle.clear();
    }
}
