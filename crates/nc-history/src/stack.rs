//! Bounded LIFO stack that evicts from the bottom on overflow.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// A stack holding at most `capacity` items. Pushing past the bound drops
/// the oldest items; they are gone for good.
#[derive(Debug, Clone)]
pub struct BoundedStack<T> {
    items: VecDeque<T>,
    capacity: NonZeroUsize,
}

impl<T> BoundedStack<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Push onto the top, returning how many items were evicted.
    pub fn push(&mut self, item: T) -> usize {
        self.items.push_back(item);
        self.evict_overflow()
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Swap the top item for `item`, returning the old top. Does nothing
    /// and returns `None` when empty.
    pub fn replace_top(&mut self, item: T) -> Option<T> {
        let top = self.items.back_mut()?;
        Some(std::mem::replace(top, item))
    }

    /// Change the bound, evicting immediately if the stack is now too tall.
    pub fn set_capacity(&mut self, capacity: NonZeroUsize) -> usize {
        self.capacity = capacity;
        self.evict_overflow()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items from oldest (bottom) to newest (top).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    fn evict_overflow(&mut self) -> usize {
        let overflow = self.items.len().saturating_sub(self.capacity.get());
        self.items.drain(..overflow);
        overflow
    }
}
