//!
//! Bounded history buffers
//!
//! Two variants share the push/pop/recent contract: a lock-free
//! single-producer single-consumer buffer for hot paths, and a
//! mutex-guarded overwriting buffer used by the collector for
//! snapshot history.
//!
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free SPSC ring buffer.
///
/// Storage holds `capacity + 1` slots; one slot is kept empty as a
/// sentinel so that full and empty are distinguishable without an extra
/// flag. The producer writes the payload then releases `tail`; the
/// consumer acquires `tail`, reads the payload, then releases `head`.
///
/// The contract is single-producer, single-consumer: at most one thread
/// calls `push` and at most one thread calls `pop` at a time. `len`,
/// `is_empty` and `is_full` are safe from either side.
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Consumer position: next slot to read
    head: AtomicUsize,
    /// Producer position: next slot to write
    tail: AtomicUsize,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Create a buffer holding up to `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity + 1)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    /// Push an item, failing when the buffer is full.
    ///
    /// Producer side only.
    pub fn push(&self, item: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = self.advance(tail);
        if next == self.head.load(Ordering::Acquire) {
            return false;
        }
        // Safety: the sentinel slot guarantees the consumer is not
        // reading `tail` while head != next; this thread is the only
        // producer.
        unsafe {
            (*self.slots[tail].get()).write(item);
        }
        self.tail.store(next, Ordering::Release);
        true
    }

    /// Pop the oldest item, if any.
    ///
    /// Consumer side only.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        // Safety: head != tail, so the slot was fully written by the
        // producer before the tail release we just acquired; this
        // thread is the only consumer.
        let item = unsafe { (*self.slots[head].get()).assume_init_read() };
        self.head.store(self.advance(head), Ordering::Release);
        Some(item)
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        if tail >= head {
            tail - head
        } else {
            self.slots.len() - head + tail
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Usable capacity (excludes the sentinel slot).
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

/// Mutex-guarded overwriting ring buffer, safe for any number of
/// producers and consumers.
///
/// `push` never fails: when the buffer is full the oldest item is
/// evicted to make room and `push` reports the eviction. The collector
/// counts those as buffer overflows.
pub struct SharedRingBuffer<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> SharedRingBuffer<T> {
    /// Create a buffer holding up to `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Push an item, evicting the oldest when full.
    ///
    /// Returns `true` if an eviction occurred. With zero capacity the
    /// item itself is the eviction.
    pub fn push(&self, item: T) -> bool {
        if self.capacity == 0 {
            return true;
        }
        let mut items = self.items.lock();
        let evicted = items.len() == self.capacity;
        if evicted {
            items.pop_front();
        }
        items.push_back(item);
        evicted
    }

    /// Pop the oldest item, if any.
    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> SharedRingBuffer<T> {
    /// Up to `count` newest items, oldest first.
    pub fn recent(&self, count: usize) -> Vec<T> {
        let items = self.items.lock();
        let skip = items.len().saturating_sub(count);
        items.iter().skip(skip).cloned().collect()
    }

    /// Every buffered item, oldest first.
    pub fn items(&self) -> Vec<T> {
        let items = self.items.lock();
        items.iter().cloned().collect()
    }
}

// =======================
// Tests
// =======================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_spsc_push_pop_order() {
        let ring = RingBuffer::new(4);
        for i in 0..4 {
            assert!(ring.push(i));
        }
        assert!(ring.is_full());
        assert!(!ring.push(99));

        for i in 0..4 {
            assert_eq!(ring.pop(), Some(i));
        }
        assert_eq!(ring.pop(), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_spsc_single_slot() {
        let ring = RingBuffer::new(1);
        assert!(ring.push("a"));
        assert!(!ring.push("b"));
        assert_eq!(ring.pop(), Some("a"));
        assert!(ring.push("b"));
        assert_eq!(ring.pop(), Some("b"));
    }

    #[test]
    fn test_spsc_zero_capacity() {
        let ring = RingBuffer::new(0);
        assert!(!ring.push(1));
        assert_eq!(ring.pop(), None);
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 0);
    }

    #[test]
    fn test_spsc_wraparound() {
        let ring = RingBuffer::new(3);
        for round in 0..10 {
            assert!(ring.push(round));
            assert_eq!(ring.pop(), Some(round));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_spsc_threaded_transfer() {
        const COUNT: u64 = 10_000;
        let ring = Arc::new(RingBuffer::new(16));

        let producer = {
            let ring = ring.clone();
            std::thread::spawn(move || {
                for i in 0..COUNT {
                    while !ring.push(i) {
                        std::hint::spin_loop();
                    }
                }
            })
        };

        let mut total = 0u64;
        let mut expected_next = 0u64;
        while expected_next < COUNT {
            if let Some(v) = ring.pop() {
                assert_eq!(v, expected_next);
                total += v;
                expected_next += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        producer.join().unwrap();
        assert_eq!(total, COUNT * (COUNT - 1) / 2);
    }

    #[test]
    fn test_shared_overflow_eviction() {
        let ring = SharedRingBuffer::new(8);
        let mut evictions = 0;
        for i in 0..13 {
            if ring.push(i) {
                evictions += 1;
            }
        }
        assert_eq!(evictions, 5);
        assert_eq!(ring.len(), 8);
        assert_eq!(ring.recent(8), (5..13).collect::<Vec<_>>());
    }

    #[test]
    fn test_shared_recent_bounds() {
        let ring = SharedRingBuffer::new(4);
        assert!(ring.recent(10).is_empty());
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.recent(10), vec![1, 2]);
        assert_eq!(ring.recent(1), vec![2]);
        assert_eq!(ring.items(), vec![1, 2]);
    }

    #[test]
    fn test_shared_pop() {
        let ring = SharedRingBuffer::new(2);
        ring.push("x");
        ring.push("y");
        assert_eq!(ring.pop(), Some("x"));
        assert_eq!(ring.pop(), Some("y"));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_shared_zero_capacity() {
        let ring = SharedRingBuffer::new(0);
        // Every push overflows, nothing is retained
        assert!(ring.push(1));
        assert!(ring.push(2));
        assert_eq!(ring.len(), 0);
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
        assert!(ring.recent(5).is_empty());
    }

    #[test]
    fn test_shared_concurrent_push() {
        let ring = Arc::new(SharedRingBuffer::new(1024));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ring = ring.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        ring.push(i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ring.len(), 400);
    }
}
