//! Fixed-capacity blocking FIFO shared between the producer and the transmitter thread.
//!
//! See [`BoundedQueue`] for details.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::{Error, Result};

/// A fixed-capacity, multi-producer/multi-consumer FIFO with blocking and non-blocking
/// `put`/`get`.
///
/// One mutex guards a ring of `capacity + 1` slots, so full and empty are told apart by the
/// read and write cursors alone. Two condition variables wake blocked writers (`not_full`)
/// and blocked readers (`not_empty`).
///
/// ```rust
/// use apa102_display::bounded_queue::BoundedQueue;
///
/// let queue = BoundedQueue::new("example", 2);
/// queue.put('a', true).unwrap();
/// queue.put('b', true).unwrap();
///
/// // Full: a non-blocking put hands the item back.
/// let rejected = queue.put('c', false).unwrap_err();
/// assert_eq!(rejected.into_inner(), 'c');
///
/// assert_eq!(queue.get(true).unwrap(), 'a');
/// assert_eq!(queue.get(true).unwrap(), 'b');
/// assert!(queue.get(false).is_err());
/// ```
#[derive(Debug)]
pub struct BoundedQueue<T> {
    name: &'static str,
    ring: Mutex<Ring<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// The item a non-blocking [`BoundedQueue::put`] could not store.
#[derive(Debug, PartialEq, Eq)]
pub struct Rejected<T>(T);

impl<T> Rejected<T> {
    /// Take the item back.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<Rejected<T>> for Error {
    fn from(_: Rejected<T>) -> Self {
        Self::WouldBlock
    }
}

#[derive(Debug)]
struct Ring<T> {
    slots: Vec<Option<T>>,
    read: usize,
    write: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);
        Self {
            slots,
            read: 0,
            write: 0,
        }
    }

    fn advance(&self, cursor: usize) -> usize {
        (cursor + 1) % self.slots.len()
    }

    fn is_empty(&self) -> bool {
        self.read == self.write
    }

    fn is_full(&self) -> bool {
        self.advance(self.write) == self.read
    }

    fn len(&self) -> usize {
        (self.write + self.slots.len() - self.read) % self.slots.len()
    }

    fn push(&mut self, item: T) {
        debug_assert!(!self.is_full());
        self.slots[self.write] = Some(item);
        self.write = self.advance(self.write);
    }

    fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.read].take();
        self.read = self.advance(self.read);
        item
    }
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            name,
            ring: Mutex::new(Ring::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Name given at construction, used in log messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum number of items the queue holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().slots.len() - 1
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when no item is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append `item`.
    ///
    /// On a full queue, waits for a slot when `block` is `true`; otherwise returns at once.
    ///
    /// # Errors
    ///
    /// Returns the item wrapped in [`Rejected`] when `block` is `false` and the queue is full.
    pub fn put(&self, item: T, block: bool) -> core::result::Result<(), Rejected<T>> {
        let mut ring = self.lock();
        while ring.is_full() {
            if !block {
                return Err(Rejected(item));
            }
            log::trace!("{}: full, waiting", self.name);
            ring = self
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        ring.push(item);
        drop(ring);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item.
    ///
    /// On an empty queue, waits for an item when `block` is `true`; otherwise returns at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] when `block` is `false` and the queue is empty.
    pub fn get(&self, block: bool) -> Result<T> {
        let mut ring = self.lock();
        let item = loop {
            if let Some(item) = ring.pop() {
                break item;
            }
            if !block {
                return Err(Error::WouldBlock);
            }
            log::trace!("{}: empty, waiting", self.name);
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        };
        drop(ring);
        self.not_full.notify_one();
        Ok(item)
    }

    // The ring only holds cursors and owned items, so a panic elsewhere cannot leave it
    // half-updated.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
