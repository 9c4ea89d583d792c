//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: a simulated commerce platform and local
//! key-value storage for the consumable log.

mod consumable_log;
mod platform;
mod storage;

pub use consumable_log::ConsumableLogStore;
pub use platform::{ScriptedPurchase, SimulatedPlatform};
pub use storage::{FileBackedKVStore, InMemoryKVStore};
