//! # Shared Bus - Published State Bridge
//!
//! Republishes store state to observers such as a UI layer.
//!
//! ## Guarantees
//!
//! - **Replay-latest:** a new subscriber receives the current value first
//! - **Ordered:** every later value arrives in publish order
//! - **Lossless:** each subscriber has its own unbounded queue, so a slow
//!   observer sees every intermediate value
//! - **Single context:** observers attached through `receive_on` run on one
//!   `MainContext` task, never concurrently
//!
//! ```text
//! ┌──────────────┐   set()    ┌──────────────┐  recv()   ┌──────────────┐
//! │ StoreManager │ ─────────→ │ Published<T> │ ────────→ │ MainContext  │
//! └──────────────┘            └──────────────┘           └──────┬───────┘
//!                                                               ↓
//!                                                           observers
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod context;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use context::{Cancellable, CancellableBag, MainContext};
pub use publisher::Published;
pub use subscriber::{StateStream, Subscription, SubscriptionError};
