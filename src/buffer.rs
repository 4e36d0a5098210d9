//! Fixed-capacity circular sample history.
//!
//! [`RingBuffer`] backs the scrollable heatmap: once full, every push
//! overwrites the logically oldest element. Index 0 always denotes the
//! oldest currently-held element regardless of physical storage position.
//! Reads take a shared lock, writes an exclusive one, so a single instance
//! can be shared across tasks behind an `Arc`.

use std::sync::{PoisonError, RwLock};

/// A thread-safe generic circular buffer with overwrite-on-full semantics.
#[derive(Debug)]
pub struct RingBuffer<T> {
    inner: RwLock<Inner<T>>,
    capacity: usize,
}

#[derive(Debug)]
struct Inner<T> {
    /// Grows up to `capacity`, then slots are overwritten in place.
    data: Vec<T>,
    /// Next write position once the buffer has wrapped.
    head: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a new ring buffer with the given capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            inner: RwLock::new(Inner { data: Vec::with_capacity(capacity), head: 0 }),
            capacity,
        }
    }

    /// Add an item. If the buffer is full, the oldest item is overwritten.
    pub fn push(&self, item: T) {
        let mut inner = self.write();
        if inner.data.len() < self.capacity {
            inner.data.push(item);
        } else {
            let head = inner.head;
            inner.data[head] = item;
            inner.head = (head + 1) % self.capacity;
        }
    }

    /// Number of elements currently held.
    pub fn len(&self) -> usize {
        self.read().data.len()
    }

    /// True when no elements are held.
    pub fn is_empty(&self) -> bool {
        self.read().data.is_empty()
    }

    /// Maximum capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The item at the given logical index (0 is oldest), if in range.
    pub fn get(&self, index: usize) -> Option<T> {
        let inner = self.read();
        if index >= inner.data.len() {
            return None;
        }
        Some(inner.data[self.physical(&inner, index)].clone())
    }

    /// The most recent item, if any.
    pub fn last(&self) -> Option<T> {
        let inner = self.read();
        let count = inner.data.len();
        if count == 0 {
            return None;
        }
        Some(inner.data[self.physical(&inner, count - 1)].clone())
    }

    /// Items from `start` to `end` (both inclusive, 0 is oldest),
    /// oldest-first. `end` is clamped to the newest element; an inverted or
    /// out-of-range window yields an empty vector.
    pub fn get_range(&self, start: usize, end: usize) -> Vec<T> {
        let inner = self.read();
        let count = inner.data.len();
        if count == 0 || start >= count {
            return Vec::new();
        }
        let end = end.min(count - 1);
        if start > end {
            return Vec::new();
        }
        (start..=end)
            .map(|i| inner.data[self.physical(&inner, i)].clone())
            .collect()
    }

    /// The last `n` items, oldest-first. `n` is clamped to the current count.
    pub fn get_last_n(&self, n: usize) -> Vec<T> {
        let inner = self.read();
        let count = inner.data.len();
        let n = n.min(count);
        if n == 0 {
            return Vec::new();
        }
        (count - n..count)
            .map(|i| inner.data[self.physical(&inner, i)].clone())
            .collect()
    }

    /// Every held item, oldest-first.
    pub fn all(&self) -> Vec<T> {
        let inner = self.read();
        (0..inner.data.len())
            .map(|i| inner.data[self.physical(&inner, i)].clone())
            .collect()
    }

    /// Remove all items. The backing storage is retained for reuse.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.data.clear();
        inner.head = 0;
    }

    /// Translate a logical index (0 = oldest) to a physical slot.
    fn physical(&self, inner: &Inner<T>, index: usize) -> usize {
        if inner.data.len() < self.capacity {
            // Not yet wrapped; storage order is logical order.
            index
        } else {
            (inner.head + index) % self.capacity
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_and_get_before_wrap() {
        let buffer = RingBuffer::new(5);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get(0), Some(1));
        assert_eq!(buffer.get(2), Some(3));
        assert_eq!(buffer.get(3), None);
        assert_eq!(buffer.last(), Some(3));
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let buffer = RingBuffer::new(3);
        for i in 1..=5 {
            buffer.push(i);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.all(), vec![3, 4, 5]);
        assert_eq!(buffer.get(0), Some(3));
        assert_eq!(buffer.last(), Some(5));
    }

    #[test]
    fn get_range_clamps_end() {
        let buffer = RingBuffer::new(4);
        for i in 0..4 {
            buffer.push(i);
        }

        assert_eq!(buffer.get_range(1, 99), vec![1, 2, 3]);
        assert_eq!(buffer.get_range(2, 1), Vec::<i32>::new());
        assert_eq!(buffer.get_range(99, 100), Vec::<i32>::new());
    }

    #[test]
    fn get_range_empty_buffer() {
        let buffer: RingBuffer<i32> = RingBuffer::new(4);
        assert_eq!(buffer.get_range(0, 3), Vec::<i32>::new());
    }

    #[test]
    fn get_last_n_clamps() {
        let buffer = RingBuffer::new(3);
        for i in 1..=5 {
            buffer.push(i);
        }

        assert_eq!(buffer.get_last_n(2), vec![4, 5]);
        assert_eq!(buffer.get_last_n(10), vec![3, 4, 5]);
        assert_eq!(buffer.get_last_n(0), Vec::<i32>::new());
    }

    #[test]
    fn clear_allows_reuse() {
        let buffer = RingBuffer::new(3);
        for i in 1..=5 {
            buffer.push(i);
        }
        buffer.clear();

        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);

        buffer.push(10);
        buffer.push(11);
        assert_eq!(buffer.all(), vec![10, 11]);
    }

    proptest! {
        /// After pushing `capacity + k` items, `all()` is exactly the last
        /// `capacity` items in push order.
        #[test]
        fn eviction_is_fifo(capacity in 1usize..32, extra in 1usize..64) {
            let buffer = RingBuffer::new(capacity);
            let total = capacity + extra;
            for i in 0..total {
                buffer.push(i);
            }

            prop_assert_eq!(buffer.len(), capacity);
            let expected: Vec<usize> = (total - capacity..total).collect();
            prop_assert_eq!(buffer.all(), expected);
        }

        /// Views stay mutually consistent for any push count.
        #[test]
        fn views_agree(capacity in 1usize..16, pushes in 0usize..48) {
            let buffer = RingBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(i);
            }

            let all = buffer.all();
            prop_assert_eq!(all.len(), buffer.len());
            prop_assert_eq!(buffer.get_last_n(buffer.len()), all.clone());
            if !all.is_empty() {
                prop_assert_eq!(buffer.get_range(0, all.len() - 1), all.clone());
                prop_assert_eq!(buffer.get(0), Some(all[0]));
                prop_assert_eq!(buffer.last(), Some(all[all.len() - 1]));
            }
        }
    }
}
