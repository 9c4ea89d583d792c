//! # Service Layer
//!
//! Async orchestration over the pure algorithms and the outbound ports.

mod listener;
mod reconciler;
mod state;
mod store_manager;

pub use listener::TransactionListener;
pub use reconciler::EntitlementReconciler;
pub use state::StoreState;
pub use store_manager::StoreManager;
