//! Bounded, oldest-evicted-first record store.

use std::collections::{VecDeque, vec_deque};

/// Fixed-capacity FIFO buffer holding the most recent records.
///
/// Pushing into a full buffer evicts exactly one record, the oldest.
#[derive(Debug, Clone)]
pub struct EventBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> EventBuffer<T> {
    /// Create an empty buffer.
    ///
    /// A capacity of zero is rejected by config validation before a buffer
    /// is ever built; here it is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a record, returning the evicted one if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity { self.items.pop_front() } else { None };
        self.items.push_back(item);

        debug_assert!(self.items.len() <= self.capacity);
        evicted
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no records are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of records held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest record, if any.
    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Newest record, if any.
    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// The `limit` most recent records, oldest first.
    pub fn latest(&self, limit: usize) -> impl DoubleEndedIterator<Item = &T> {
        let skip = self.items.len().saturating_sub(limit);
        self.items.iter().skip(skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut buffer = EventBuffer::new(3);

        assert_eq!(buffer.push(1), None);
        assert_eq!(buffer.push(2), None);
        assert_eq!(buffer.push(3), None);
        assert_eq!(buffer.push(4), Some(1));

        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn latest_returns_tail_in_insertion_order() {
        let mut buffer = EventBuffer::new(5);
        for i in 0..5 {
            buffer.push(i);
        }

        assert_eq!(buffer.latest(2).copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(buffer.latest(2).rev().copied().collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(buffer.latest(99).count(), 5);
        assert_eq!(buffer.latest(0).count(), 0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buffer = EventBuffer::new(0);
        buffer.push('a');
        buffer.push('b');

        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.newest(), Some(&'b'));
        assert_eq!(buffer.oldest(), Some(&'b'));
    }
}
