//! Bounded in-memory history
//!
//! `HistoryBuffer` is a fixed-capacity ring: an arena of slots plus the index of the oldest entry.
//! Once the arena is full every push overwrites the oldest slot, so `len() <= capacity()` holds by
//! construction.
//!
//! The buffer has a single writer (the processor of one agent). Everything else sees it through a
//! [`HistoryReader`], which only hands out copies.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Default number of entries kept per agent
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    slots: Vec<T>,
    /// Index of the oldest entry. Only moves once the arena is full.
    head: usize,
    capacity: NonZeroUsize,
}

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity.get()),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append an entry, evicting the oldest one when the buffer is full.
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity.get() {
            self.slots.push(item);
            return;
        }

        self.slots[self.head] = item;
        self.head = (self.head + 1) % self.capacity.get();
    }

    /// Most recent entry, if any
    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }

        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }

    /// Entries in insertion order, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Up to `limit` most recent entries, most recent last.
    pub fn snapshot(&self, limit: usize) -> Vec<T> {
        let skip = self.len().saturating_sub(limit);
        self.iter().skip(skip).cloned().collect()
    }
}

/// Create a shared buffer and the read-only accessor handed to the query layer.
pub fn shared<T>(capacity: NonZeroUsize) -> (Arc<RwLock<HistoryBuffer<T>>>, HistoryReader<T>) {
    let buffer = Arc::new(RwLock::new(HistoryBuffer::new(capacity)));
    let reader = HistoryReader {
        buffer: buffer.clone(),
    };

    (buffer, reader)
}

/// Read-only view on a shared history buffer
///
/// The lock is held only while entries are copied out.
#[derive(Debug)]
pub struct HistoryReader<T> {
    buffer: Arc<RwLock<HistoryBuffer<T>>>,
}

impl<T> Clone for HistoryReader<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
        }
    }
}

impl<T: Clone> HistoryReader<T> {
    pub async fn latest(&self) -> Option<T> {
        self.buffer.read().await.latest().cloned()
    }

    pub async fn snapshot(&self, limit: usize) -> Vec<T> {
        self.buffer.read().await.snapshot(limit)
    }

    pub async fn len(&self) -> usize {
        self.buffer.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.read().await.is_empty()
    }
}
