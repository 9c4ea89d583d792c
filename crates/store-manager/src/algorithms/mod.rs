//! # Algorithms Module
//!
//! Pure catalog and entitlement logic for the store manager.

pub mod partition;
pub mod reconcile;
pub mod verification;

pub use partition::{partition_catalog, PartitionOutcome};
pub use reconcile::{classify_entitlements, ClassifiedEntitlements};
pub use verification::check_verified;
