//! # State Publisher
//!
//! Defines the publishing side of the state bridge.

use crate::subscriber::{StateStream, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

struct Slot<T> {
    /// Latest value, replayed to new subscribers.
    current: T,

    /// One queue per live subscriber.
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

struct Inner<T> {
    /// Name used in logs.
    name: &'static str,

    /// Value and subscriber queues, locked together.
    slot: Mutex<Slot<T>>,

    /// Total values published.
    values_published: AtomicU64,
}

/// A replay-latest observable value.
///
/// New subscribers receive the current value immediately, then every later
/// value in publish order. Each subscriber has its own unbounded queue, so a
/// slow subscriber never loses an intermediate value. Cloning yields another
/// handle to the same value.
///
/// Publishing holds the value lock while enqueueing, so a subscriber that
/// joins concurrently sees either the old value followed by the new one, or
/// only the new one. It never misses or reorders a change.
pub struct Published<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Published<T> {
    /// Create a published value.
    #[must_use]
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                slot: Mutex::new(Slot {
                    current: initial,
                    subscribers: Vec::new(),
                }),
                values_published: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.slot.lock().current.clone()
    }

    /// Replace the current value and notify subscribers.
    ///
    /// Returns the number of subscribers the value was queued for.
    pub fn set(&self, value: T) -> usize {
        let mut slot = self.inner.slot.lock();
        slot.subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        slot.current = value;
        self.inner.values_published.fetch_add(1, Ordering::Relaxed);

        let receivers = slot.subscribers.len();
        trace!(name = self.inner.name, receivers, "[bridge] Value published");
        receivers
    }

    /// Subscribe, receiving the current value first.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let mut slot = self.inner.slot.lock();
        let (sender, receiver) = mpsc::unbounded_channel();
        slot.subscribers.push(sender);
        debug!(name = self.inner.name, "[bridge] New subscription created");
        Subscription::new(self.inner.name, slot.current.clone(), receiver)
    }

    /// Subscribe as a `Stream`.
    #[must_use]
    pub fn stream(&self) -> StateStream<T> {
        StateStream::new(self.subscribe())
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .slot
            .lock()
            .subscribers
            .iter()
            .filter(|subscriber| !subscriber.is_closed())
            .count()
    }

    /// Total number of values published since creation.
    #[must_use]
    pub fn values_published(&self) -> u64 {
        self.inner.values_published.load(Ordering::Relaxed)
    }

    /// Name of the published value.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }
}

impl<T: Clone + Default + Send + 'static> Default for Published<T> {
    fn default() -> Self {
        Self::new("unnamed", T::default())
    }
}
