//! # Delivery Context
//!
//! A single serial executor that observers are called on, plus the handles
//! used to stop delivery.

use crate::subscriber::SubscriptionError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct ContextInner {
    name: &'static str,
    sender: mpsc::UnboundedSender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
    jobs_run: Arc<AtomicU64>,
}

/// A designated execution context for observers.
///
/// Every job posted here runs on one task, one at a time, in posting order,
/// so observers never see concurrent mutation. Cloning yields another handle
/// to the same context.
#[derive(Clone)]
pub struct MainContext {
    inner: Arc<ContextInner>,
}

impl MainContext {
    /// Start a context on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let jobs_run = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&jobs_run);

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job();
                counter.fetch_add(1, Ordering::Relaxed);
            }
            debug!(context = name, "[bridge] Delivery context drained");
        });

        info!(context = name, "[bridge] Delivery context started");

        Self {
            inner: Arc::new(ContextInner {
                name,
                sender,
                worker: Mutex::new(Some(worker)),
                jobs_run,
            }),
        }
    }

    /// Queue a job for serial execution.
    pub fn post<F>(&self, job: F) -> Result<(), SubscriptionError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner
            .sender
            .send(Box::new(job))
            .map_err(|_| SubscriptionError::ContextStopped)
    }

    /// Number of jobs executed so far.
    #[must_use]
    pub fn jobs_run(&self) -> u64 {
        self.inner.jobs_run.load(Ordering::Relaxed)
    }

    /// Stop the context. Safe to call more than once.
    pub fn stop(&self) {
        if let Some(worker) = self.inner.worker.lock().take() {
            worker.abort();
            info!(context = self.inner.name, "[bridge] Delivery context stopped");
        }
    }

    /// Whether the worker task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}

/// Handle that stops a delivery when cancelled or dropped.
#[must_use = "delivery stops when the handle is dropped"]
pub struct Cancellable {
    handle: Option<JoinHandle<()>>,
}

impl Cancellable {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Stop delivery. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for Cancellable {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A set of cancellables dropped together.
#[derive(Default)]
pub struct CancellableBag {
    items: Vec<Cancellable>,
}

impl CancellableBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a handle alive for as long as the bag.
    pub fn store(&mut self, cancellable: Cancellable) {
        self.items.push(cancellable);
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cancel and drop every handle.
    pub fn cancel_all(&mut self) {
        for mut item in self.items.drain(..) {
            item.cancel();
        }
    }
}
