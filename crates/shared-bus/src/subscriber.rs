//! # State Subscriber
//!
//! Defines the subscription side of the state bridge.

use crate::context::{Cancellable, MainContext};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The publisher was dropped.
    #[error("State publisher closed")]
    Closed,

    /// The delivery context is no longer running.
    #[error("Delivery context stopped")]
    ContextStopped,
}

/// A subscription handle for receiving values.
///
/// The first value received is the one current at subscription time. Later
/// values are queued without bound until received.
pub struct Subscription<T> {
    /// Name of the published value, for logs.
    name: &'static str,

    /// Replayed value not yet handed out.
    pending: Option<T>,

    /// Values published since subscribing.
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub(crate) fn new(
        name: &'static str,
        current: T,
        receiver: mpsc::UnboundedReceiver<T>,
    ) -> Self {
        Self {
            name,
            pending: Some(current),
            receiver,
        }
    }

    /// Receive the next value.
    ///
    /// # Returns
    ///
    /// - `Some(value)` - The replayed value, then each later value in order
    /// - `None` - The publisher was dropped
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        self.receiver.recv().await
    }

    /// Try to receive the next value without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` - A value was available
    /// - `Ok(None)` - No value available (would block)
    /// - `Err(SubscriptionError::Closed)` - The publisher was dropped
    pub fn try_recv(&mut self) -> Result<Option<T>, SubscriptionError> {
        if let Some(value) = self.pending.take() {
            return Ok(Some(value));
        }

        match self.receiver.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Deliver every value to `sink` on the given context.
    ///
    /// A forwarding task reads this subscription and posts each value to the
    /// context, which runs sinks one at a time in posting order. Dropping or
    /// cancelling the returned handle stops delivery.
    pub fn receive_on<F>(mut self, context: &MainContext, sink: F) -> Cancellable
    where
        F: FnMut(T) + Send + 'static,
    {
        let context = context.clone();
        let sink = Arc::new(Mutex::new(sink));
        let name = self.name;

        let handle = tokio::spawn(async move {
            while let Some(value) = self.recv().await {
                let sink = Arc::clone(&sink);
                let posted = context.post(move || {
                    let mut sink = sink.lock();
                    (*sink)(value);
                });
                if posted.is_err() {
                    debug!(name, "[bridge] Context stopped, ending delivery");
                    return;
                }
            }
            debug!(name, "[bridge] Publisher closed, ending delivery");
        });

        Cancellable::new(handle)
    }

    /// Name of the published value.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct StateStream<T> {
    pending: Option<T>,
    inner: UnboundedReceiverStream<T>,
}

impl<T: Clone + Send + 'static> StateStream<T> {
    /// Create a stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription<T>) -> Self {
        Self {
            pending: subscription.pending,
            inner: UnboundedReceiverStream::new(subscription.receiver),
        }
    }
}

impl<T: Clone + Send + Unpin + 'static> Stream for StateStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(value) = self.pending.take() {
            return Poll::Ready(Some(value));
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
