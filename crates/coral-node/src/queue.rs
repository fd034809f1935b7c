//! The bounded work queue parallel mode feeds workers from: freshness-preserving backpressure via
//! drop-oldest-on-overflow instead of blocking the dispatch loop or rejecting the newest frame.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// A bounded, multi-producer multi-consumer queue that evicts the oldest entry when a push would
/// exceed capacity, so a slow consumer never stalls the dispatch loop and the pipeline keeps
/// processing the newest frames under sustained overload.
pub struct DroppingQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> DroppingQueue<T> {
    /// Creates a queue that holds at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            items: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
        })
    }

    /// Pushes `item`. If the queue is already at capacity, evicts the oldest entry first and
    /// returns it so the caller can count the eviction as a "full" drop.
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self.items.lock();
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        drop(items);
        self.notify.notify_one();
        evicted
    }

    /// Pops the oldest item, waiting until one is available.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.items.lock().pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    /// Current queue length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
