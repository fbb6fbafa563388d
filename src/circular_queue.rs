use std::collections::VecDeque;
use std::fmt;

/// Fixed capacity FIFO. Pushing into a full queue evicts the oldest item.
///
/// Iteration always runs from the oldest to the newest item.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T: serde::Serialize> serde::Serialize for CircularQueue<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.deque.iter())
    }
}

impl<T> CircularQueue<T> {
    /// A zero capacity is bumped to one so the queue can always hold the latest item.
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            deque: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.deque.back()
    }

    /// The item pushed right before the latest one.
    #[inline]
    pub fn previous(&self) -> Option<&T> {
        let len = self.deque.len();
        if len < 2 {
            return None;
        }

        self.deque.get(len - 2)
    }

    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'_ T> + ExactSizeIterator {
        self.deque.iter()
    }

    /// The newest `n` items, oldest first.
    #[inline]
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &'_ T> {
        self.deque.iter().skip(self.deque.len().saturating_sub(n))
    }
}
