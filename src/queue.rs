//! Bounded sample queue shared by the producer and consumer threads.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::sample::Sample;

/// Largest capacity a queue can be built with; larger requests are capped.
pub const MAX_CAPACITY: usize = 1024;

/// `push` was refused because the queue is full; the sample is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull(pub Sample);

/// `pop` found nothing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEmpty;

/// A queue cannot be built with zero slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroCapacity;

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sample queue is full")
    }
}

impl fmt::Display for QueueEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sample queue is empty")
    }
}

impl fmt::Display for ZeroCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sample queue capacity must be at least 1")
    }
}

impl std::error::Error for QueueFull {}
impl std::error::Error for QueueEmpty {}
impl std::error::Error for ZeroCapacity {}

/// Fixed-capacity FIFO ring of samples.
///
/// Exactly `len()` slots starting at the read cursor hold unread samples; the
/// rest are logically empty whatever they contain. A full queue rejects new
/// samples instead of overwriting old ones.
#[derive(Debug)]
pub struct SampleQueue {
    slots: Box<[Sample]>,
    write_index: usize,
    read_index: usize,
    count: usize,
}

impl SampleQueue {
    /// Creates an empty queue with `capacity` slots, capped to [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self, ZeroCapacity> {
        if capacity == 0 {
            return Err(ZeroCapacity);
        }

        let capacity = capacity.min(MAX_CAPACITY);
        Ok(Self {
            slots: vec![Sample::default(); capacity].into_boxed_slice(),
            write_index: 0,
            read_index: 0,
            count: 0,
        })
    }

    /// Appends a sample at the write cursor.
    pub fn push(&mut self, sample: Sample) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull(sample));
        }

        self.slots[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    /// Removes the oldest sample.
    pub fn pop(&mut self) -> Result<Sample, QueueEmpty> {
        if self.is_empty() {
            return Err(QueueEmpty);
        }

        let sample = self.slots[self.read_index];
        self.read_index = (self.read_index + 1) % self.slots.len();
        self.count -= 1;
        Ok(sample)
    }

    /// Returns `true` when there is nothing to pop.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` when the next push would be rejected.
    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Number of unread samples.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Number of slots, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Splits the queue into its single writer and single reader.
    ///
    /// The halves are the only way to reach the queue afterwards, so at most
    /// one thread pushes and one pops. Each operation holds the lock for one
    /// slot update.
    pub fn split(self) -> (Producer, Consumer) {
        let shared = Arc::new(Mutex::new(self));
        (
            Producer {
                queue: Arc::clone(&shared),
            },
            Consumer { queue: shared },
        )
    }
}

fn lock(queue: &Mutex<SampleQueue>) -> MutexGuard<'_, SampleQueue> {
    // Push and pop leave the ring consistent at every point a panic could occur,
    // so a poisoned lock still guards valid state.
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write half of a split [`SampleQueue`].
#[derive(Debug)]
pub struct Producer {
    queue: Arc<Mutex<SampleQueue>>,
}

impl Producer {
    /// Appends a sample; see [`SampleQueue::push`].
    pub fn push(&mut self, sample: Sample) -> Result<(), QueueFull> {
        lock(&self.queue).push(sample)
    }

    /// Returns `true` when the next push would be rejected.
    pub fn is_full(&self) -> bool {
        lock(&self.queue).is_full()
    }

    /// Number of unread samples.
    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }
}

/// Read half of a split [`SampleQueue`].
#[derive(Debug)]
pub struct Consumer {
    queue: Arc<Mutex<SampleQueue>>,
}

impl Consumer {
    /// Removes the oldest sample; see [`SampleQueue::pop`].
    pub fn pop(&mut self) -> Result<Sample, QueueEmpty> {
        lock(&self.queue).pop()
    }

    /// Returns `true` when there is nothing to pop.
    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }

    /// Number of unread samples.
    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }
}
